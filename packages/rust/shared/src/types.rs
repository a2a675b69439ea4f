//! Core domain types for the destination catalog.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{DestinosError, Result};
use crate::ordered::OrderedMap;

/// Version string stamped into every enriched document.
pub const DOCUMENT_VERSION: &str = "2.0";

/// Highest value any intensity axis can take.
pub const MAX_LEVEL: u8 = 5;

/// Maximum number of reference links attached to one place.
pub const MAX_LINKS: usize = 3;

// ---------------------------------------------------------------------------
// Intensidad / Accesibilidad
// ---------------------------------------------------------------------------

/// Three-axis difficulty profile of a place. Every axis is in `0..=5`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Intensidad {
    #[serde(default, deserialize_with = "level")]
    fisica: u8,
    #[serde(default, deserialize_with = "level")]
    vertigo: u8,
    #[serde(default, deserialize_with = "level")]
    atletico: u8,
}

/// Any number, clamped into range. Anything else reads as 0.
fn level<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u8, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    let n = raw
        .as_i64()
        .or_else(|| raw.as_f64().map(|f| f as i64))
        .unwrap_or(0);
    Ok(n.clamp(0, i64::from(MAX_LEVEL)) as u8)
}

// ---------------------------------------------------------------------------
// Lenient field readers
// ---------------------------------------------------------------------------

/// A null or mistyped value reads as the field's default.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).unwrap_or_default())
}

/// Like [`lenient`] for lists, but only the malformed entries are dropped.
fn lenient_seq<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

impl Intensidad {
    /// Build a profile, saturating each axis at [`MAX_LEVEL`].
    pub fn new(fisica: u8, vertigo: u8, atletico: u8) -> Self {
        Self {
            fisica: fisica.min(MAX_LEVEL),
            vertigo: vertigo.min(MAX_LEVEL),
            atletico: atletico.min(MAX_LEVEL),
        }
    }

    /// Physical exertion.
    pub fn fisica(&self) -> u8 {
        self.fisica
    }

    /// Height/thrill exposure.
    pub fn vertigo(&self) -> u8 {
        self.vertigo
    }

    /// Athletic skill required.
    pub fn atletico(&self) -> u8 {
        self.atletico
    }

    /// Derive the accessibility tier. This is the only way a tier is produced.
    pub fn accesibilidad(&self) -> Accesibilidad {
        if self.fisica <= 1 && self.vertigo == 0 && self.atletico <= 1 {
            Accesibilidad::Alta
        } else if self.fisica >= 4 || self.vertigo >= 4 || self.atletico >= 3 {
            Accesibilidad::Baja
        } else {
            Accesibilidad::Media
        }
    }
}

/// Coarse tier summarizing how approachable a place is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accesibilidad {
    Alta,
    Media,
    Baja,
}

impl Accesibilidad {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alta => "alta",
            Self::Media => "media",
            Self::Baja => "baja",
        }
    }
}

impl std::fmt::Display for Accesibilidad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

/// A supplementary reference link attached to a place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default, deserialize_with = "lenient")]
    pub titulo: String,
    pub url: String,
    #[serde(default, deserialize_with = "lenient")]
    pub descripcion: String,
}

impl Link {
    pub fn new(
        titulo: impl Into<String>,
        url: impl Into<String>,
        descripcion: impl Into<String>,
    ) -> Self {
        Self {
            titulo: titulo.into(),
            url: url.into(),
            descripcion: descripcion.into(),
        }
    }

    /// Lowercased URL host, or `None` if the URL does not parse or has no host.
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
    }
}

/// Check the link-list invariants: at most [`MAX_LINKS`] entries, every URL
/// has a host, and no host repeats.
pub fn validate_links(owner: &str, links: &[Link]) -> Result<()> {
    if links.len() > MAX_LINKS {
        return Err(DestinosError::validation(format!(
            "{owner}: {} links (maximum is {MAX_LINKS})",
            links.len()
        )));
    }

    let mut seen: Vec<String> = Vec::with_capacity(links.len());
    for link in links {
        let host = link.host().ok_or_else(|| {
            DestinosError::validation(format!("{owner}: link without a host: {}", link.url))
        })?;
        if seen.contains(&host) {
            return Err(DestinosError::validation(format!(
                "{owner}: duplicate link host {host}"
            )));
        }
        seen.push(host);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Place
// ---------------------------------------------------------------------------

/// A single point of interest.
///
/// `intensidad` and `accesibilidad` are private: they are only ever written
/// together through [`Place::apply`].
///
/// Catalogs are hand-edited, so every field tolerates being absent, null, or
/// of the wrong type; it then reads as its zero value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Display name; the key used for curated link attachment.
    #[serde(default, deserialize_with = "lenient")]
    pub nombre: String,
    #[serde(default, deserialize_with = "lenient")]
    pub descripcion: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "String::is_empty")]
    pub categoria: String,
    /// Sub-theme key when the place came from a nested category.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub subcategoria: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "String::is_empty")]
    pub destino: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    intensidad: Option<Intensidad>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    accesibilidad: Option<Accesibilidad>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub requisitos_especificos: Vec<String>,
    /// Seed collections call this field `links`.
    #[serde(default, alias = "links", deserialize_with = "lenient_seq")]
    pub links_utiles: Vec<Link>,
    /// Seed-authored query for dynamic link resolution. Consumed, never written.
    #[serde(default, deserialize_with = "lenient", skip_serializing)]
    pub search_query: Option<String>,
    /// Fields this crate does not own (images, prices, ...), kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The derived fields for one place, produced together and applied together.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub intensidad: Intensidad,
    pub requisitos: Vec<String>,
    /// `None` keeps whatever links the place already carries.
    pub links: Option<Vec<Link>>,
}

impl Place {
    pub fn new(nombre: impl Into<String>, descripcion: impl Into<String>) -> Self {
        Self {
            nombre: nombre.into(),
            descripcion: descripcion.into(),
            categoria: String::new(),
            subcategoria: None,
            destino: String::new(),
            intensidad: None,
            accesibilidad: None,
            requisitos_especificos: Vec::new(),
            links_utiles: Vec::new(),
            search_query: None,
            extra: Map::new(),
        }
    }

    /// Builder-style category setter.
    pub fn with_categoria(mut self, categoria: impl Into<String>) -> Self {
        self.categoria = categoria.into();
        self
    }

    /// Builder-style destination setter.
    pub fn with_destino(mut self, destino: impl Into<String>) -> Self {
        self.destino = destino.into();
        self
    }

    pub fn intensidad(&self) -> Option<Intensidad> {
        self.intensidad
    }

    pub fn accesibilidad(&self) -> Option<Accesibilidad> {
        self.accesibilidad
    }

    /// Whether the classifier has run on this place.
    pub fn is_enriched(&self) -> bool {
        self.intensidad.is_some()
    }

    /// Write every derived field in one step.
    pub fn apply(&mut self, enrichment: Enrichment) {
        self.accesibilidad = Some(enrichment.intensidad.accesibilidad());
        self.intensidad = Some(enrichment.intensidad);
        self.requisitos_especificos = enrichment.requisitos;
        if let Some(links) = enrichment.links {
            self.links_utiles = links;
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog (nested, pre-merge shape)
// ---------------------------------------------------------------------------

/// A categoria is either a flat list of places or one more level of
/// sub-themes, each holding a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Category {
    Flat(Vec<Place>),
    Nested(OrderedMap<Vec<Place>>),
}

impl Category {
    pub fn place_count(&self) -> usize {
        match self {
            Self::Flat(places) => places.len(),
            Self::Nested(themes) => themes.values().map(Vec::len).sum(),
        }
    }
}

/// All categorias of one destino.
pub type Destination = OrderedMap<Category>;

/// The nested source catalog: destino → categoria → places.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    pub destinos: OrderedMap<Destination>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of places across every destino and categoria.
    pub fn place_count(&self) -> usize {
        self.destinos
            .values()
            .flat_map(|d| d.values())
            .map(Category::place_count)
            .sum()
    }
}

// ---------------------------------------------------------------------------
// EnrichedDocument (flat, persisted shape)
// ---------------------------------------------------------------------------

/// Header of the persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default, deserialize_with = "lenient")]
    pub total_places: usize,
    /// `YYYY-MM-DD`.
    #[serde(default, deserialize_with = "lenient")]
    pub enriched_at: String,
    #[serde(default, deserialize_with = "lenient")]
    pub version: String,
    /// Keys written by other tooling (e.g. image refresh timestamps).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The flat, enriched catalog as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedDocument {
    pub metadata: DocumentMetadata,
    pub places: Vec<Place>,
}

impl EnrichedDocument {
    pub fn new(places: Vec<Place>, enriched_at: NaiveDate) -> Self {
        Self {
            metadata: DocumentMetadata {
                total_places: places.len(),
                enriched_at: enriched_at.format("%Y-%m-%d").to_string(),
                version: DOCUMENT_VERSION.to_string(),
                extra: Map::new(),
            },
            places,
        }
    }

    /// Replace the version stamp.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.metadata.version = version.into();
        self
    }

    /// Refresh the header after the places changed.
    pub fn restamp(&mut self, enriched_at: NaiveDate, version: &str) {
        self.metadata.total_places = self.places.len();
        self.metadata.enriched_at = enriched_at.format("%Y-%m-%d").to_string();
        self.metadata.version = version.to_string();
    }
}
