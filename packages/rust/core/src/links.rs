//! Link resolution: curated table lookup and dynamic search.
//!
//! Both strategies sit behind [`LinkResolver`] and answer with a
//! [`Resolution`]. Neither ever propagates an error to the orchestrator;
//! a failed lookup is a value.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, instrument, warn};
use url::Url;

use destinos_crawler::LinkSource;
use destinos_shared::{
    DestinosError, Link, MAX_LINKS, OrderedMap, Place, ResolverConfig, Result, validate_links,
};

/// Built-in curated table, embedded at compile time.
const BUILTIN_TABLE: &str = include_str!("../data/curated_links.json");

/// How many search candidates are inspected before giving up.
const MAX_CANDIDATES: usize = 10;

/// Titles longer than this are cut.
const MAX_TITLE_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Outcome of one link lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Lookup succeeded. May be empty.
    Links(Vec<Link>),
    /// Lookup failed; the place keeps whatever it had.
    Failed { reason: String },
}

impl Resolution {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Degrade to a plain list; failures become empty.
    pub fn into_links(self) -> Vec<Link> {
        match self {
            Self::Links(links) => links,
            Self::Failed { .. } => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup key
// ---------------------------------------------------------------------------

/// Owned lookup inputs, so a resolution task does not borrow the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkKey {
    pub nombre: String,
    pub destino: String,
    pub search_query: Option<String>,
}

impl LinkKey {
    pub fn from_place(place: &Place) -> Self {
        Self {
            nombre: place.nombre.clone(),
            destino: place.destino.clone(),
            search_query: place.search_query.clone(),
        }
    }

    /// The seed query if the place has one, else `"{nombre} {destino} {suffix}"`.
    pub fn query(&self, suffix: &str) -> String {
        match self.search_query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => q.to_string(),
            _ => [self.nombre.as_str(), self.destino.as_str(), suffix]
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// A strategy for turning a place into reference links.
pub trait LinkResolver: Send + Sync {
    fn resolve(&self, key: &LinkKey) -> impl Future<Output = Resolution> + Send;
}

// ---------------------------------------------------------------------------
// CuratedLinks
// ---------------------------------------------------------------------------

/// Immutable name → links table. Validated once when built.
#[derive(Debug, Clone, Default)]
pub struct CuratedLinks {
    table: OrderedMap<Vec<Link>>,
}

impl CuratedLinks {
    /// The table shipped with the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_TABLE)
    }

    /// Read a table from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DestinosError::io(path, e))?;
        Self::from_json(&content)
            .map_err(|e| DestinosError::validation(format!("{}: {e}", path.display())))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let table: OrderedMap<Vec<Link>> = serde_json::from_str(json)
            .map_err(|e| DestinosError::parse(format!("curated link table: {e}")))?;
        Self::new(table)
    }

    pub fn new(table: OrderedMap<Vec<Link>>) -> Result<Self> {
        for (nombre, links) in table.iter() {
            validate_links(nombre, links)?;
        }
        debug!(entries = table.len(), "curated link table loaded");
        Ok(Self { table })
    }

    /// Exact-name lookup.
    pub fn lookup(&self, nombre: &str) -> Option<&[Link]> {
        self.table.get(nombre).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl LinkResolver for CuratedLinks {
    async fn resolve(&self, key: &LinkKey) -> Resolution {
        Resolution::Links(self.lookup(&key.nombre).map(<[Link]>::to_vec).unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// DynamicResolver
// ---------------------------------------------------------------------------

/// Resolves links by querying a [`LinkSource`] and filtering its candidates.
pub struct DynamicResolver<S> {
    source: S,
    timeout: Duration,
    rate_limit: Duration,
    query_suffix: String,
    blocked_hosts: Vec<String>,
}

impl<S: LinkSource> DynamicResolver<S> {
    pub fn new(source: S, config: &ResolverConfig) -> Self {
        Self {
            source,
            timeout: config.timeout,
            rate_limit: Duration::from_millis(config.rate_limit_ms),
            query_suffix: config.query_suffix.clone(),
            blocked_hosts: config
                .blocked_hosts
                .iter()
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }
}

impl<S: LinkSource> LinkResolver for DynamicResolver<S> {
    #[instrument(skip_all, fields(nombre = %key.nombre))]
    async fn resolve(&self, key: &LinkKey) -> Resolution {
        // Rate limiting
        if !self.rate_limit.is_zero() {
            tokio::time::sleep(self.rate_limit).await;
        }

        let query = key.query(&self.query_suffix);
        match tokio::time::timeout(self.timeout, self.source.search(&query)).await {
            Ok(Ok(candidates)) => {
                let links = select_links(candidates, &key.nombre, &self.blocked_hosts);
                debug!(%query, links = links.len(), "links resolved");
                Resolution::Links(links)
            }
            Ok(Err(e)) => {
                warn!(%query, error = %e, "link source failed");
                Resolution::failed(e.to_string())
            }
            Err(_) => {
                warn!(%query, timeout_ms = self.timeout.as_millis(), "link lookup timed out");
                Resolution::failed(format!("timed out after {:?}", self.timeout))
            }
        }
    }
}

/// Filter raw candidates down to at most [`MAX_LINKS`] links with distinct
/// hosts, none of them blocked.
pub fn select_links(candidates: Vec<Link>, nombre: &str, blocked_hosts: &[String]) -> Vec<Link> {
    let mut selected: Vec<Link> = Vec::with_capacity(MAX_LINKS);
    let mut hosts: Vec<String> = Vec::with_capacity(MAX_LINKS);

    for candidate in candidates.into_iter().take(MAX_CANDIDATES) {
        let Ok(url) = Url::parse(candidate.url.trim()) else {
            continue;
        };
        if url.scheme() != "http" && url.scheme() != "https" {
            continue;
        }
        let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
            continue;
        };
        if is_blocked(&host, blocked_hosts) || hosts.contains(&host) {
            continue;
        }

        let titulo = truncate_chars(candidate.titulo.trim(), MAX_TITLE_CHARS);
        let descripcion = match candidate.descripcion.trim() {
            "" => format!("Información sobre {nombre}"),
            d => d.to_string(),
        };

        hosts.push(host);
        selected.push(Link::new(titulo, url.to_string(), descripcion));
        if selected.len() == MAX_LINKS {
            break;
        }
    }

    selected
}

/// `host` is blocked if a blocked entry appears in it on label boundaries:
/// `google.com` blocks `maps.google.com` and `www.google.com.mx`, not
/// `notgoogle.com`.
fn is_blocked(host: &str, blocked_hosts: &[String]) -> bool {
    let dotted = format!(".{host}.");
    blocked_hosts
        .iter()
        .any(|b| dotted.contains(&format!(".{b}.")))
}

/// Bring links authored on a place into line: entries without a host are
/// dropped, the first link per host wins, and at most [`MAX_LINKS`] are kept.
/// Titles and URLs are left as written.
pub fn normalize_links(links: &[Link]) -> Vec<Link> {
    let mut kept: Vec<Link> = Vec::with_capacity(MAX_LINKS);
    let mut hosts: Vec<String> = Vec::with_capacity(MAX_LINKS);

    for link in links {
        let Some(host) = link.host() else {
            continue;
        };
        if hosts.contains(&host) {
            continue;
        }
        hosts.push(host);
        kept.push(link.clone());
        if kept.len() == MAX_LINKS {
            break;
        }
    }

    kept
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cand(titulo: &str, url: &str) -> Link {
        Link::new(titulo, url, "")
    }

    fn blocked() -> Vec<String> {
        ResolverConfig::default().blocked_hosts
    }

    /// Test double that answers every query with a fixed list.
    struct Fixed(Vec<Link>);

    impl LinkSource for Fixed {
        async fn search(&self, _query: &str) -> Result<Vec<Link>> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl LinkSource for Broken {
        async fn search(&self, _query: &str) -> Result<Vec<Link>> {
            Err(DestinosError::Network("connection refused".into()))
        }
    }

    struct Slow;

    impl LinkSource for Slow {
        async fn search(&self, _query: &str) -> Result<Vec<Link>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![cand("late", "https://late.example/")])
        }
    }

    /// Records how many times it was queried and with what.
    #[derive(Default)]
    struct Recording {
        calls: AtomicUsize,
        last: std::sync::Mutex<String>,
    }

    impl LinkSource for Recording {
        async fn search(&self, query: &str) -> Result<Vec<Link>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = query.to_string();
            Ok(Vec::new())
        }
    }

    fn fast_config() -> ResolverConfig {
        ResolverConfig {
            timeout: Duration::from_millis(200),
            rate_limit_ms: 0,
            ..ResolverConfig::default()
        }
    }

    #[test]
    fn select_caps_and_dedups_by_host() {
        let candidates = vec![
            cand("A", "https://a.example/1"),
            cand("A again", "https://A.example/2"),
            cand("B", "https://b.example/"),
            cand("C", "https://c.example/"),
            cand("D", "https://d.example/"),
        ];
        let links = select_links(candidates, "Lugar", &blocked());
        let urls: Vec<_> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://a.example/1", "https://b.example/", "https://c.example/"]
        );
        assert!(validate_links("Lugar", &links).is_ok());
    }

    #[test]
    fn select_drops_noise_and_non_http() {
        let candidates = vec![
            cand("Maps", "https://maps.google.com/x"),
            cand("Video", "https://www.youtube.com/watch?v=1"),
            cand("Mail", "mailto:a@b.example"),
            cand("FTP", "ftp://files.example/a"),
            cand("Box", "https://xbox.com/"),
            cand("Guide", "https://guide.example/"),
        ];
        let links = select_links(candidates, "Lugar", &blocked());
        let urls: Vec<_> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://xbox.com/", "https://guide.example/"]);
    }

    #[test]
    fn regional_search_hosts_are_blocked() {
        let candidates = vec![
            cand("MX", "https://www.google.com.mx/search?q=x"),
            cand("BR", "https://google.com.br/"),
            cand("Lookalike", "https://notgoogle.com/"),
        ];
        let links = select_links(candidates, "Lugar", &blocked());
        let urls: Vec<_> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://notgoogle.com/"]);
    }

    #[test]
    fn select_only_inspects_first_ten() {
        let mut candidates: Vec<Link> = (0..10)
            .map(|i| cand("noise", &format!("https://youtube.com/{i}")))
            .collect();
        candidates.push(cand("late", "https://late.example/"));
        assert!(select_links(candidates, "Lugar", &blocked()).is_empty());
    }

    #[test]
    fn select_fills_description_and_truncates_title() {
        let long = "x".repeat(150);
        let links = select_links(vec![cand(&long, "https://a.example/")], "Cenote Azul", &[]);
        assert_eq!(links[0].titulo.chars().count(), 100);
        assert_eq!(links[0].descripcion, "Información sobre Cenote Azul");
    }

    #[test]
    fn normalize_dedups_hosts_and_caps() {
        let authored = vec![
            cand("A", "https://a.example/1"),
            cand("A2", "https://a.example/2"),
            cand("broken", "not a url"),
            cand("B", "https://b.example/"),
            cand("C", "https://c.example/"),
            cand("D", "https://d.example/"),
        ];
        let links = normalize_links(&authored);
        let titles: Vec<_> = links.iter().map(|l| l.titulo.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
        assert!(validate_links("X", &links).is_ok());
        assert_eq!(normalize_links(&links), links);
    }

    #[test]
    fn query_prefers_seed_query() {
        let mut key = LinkKey {
            nombre: "Playa Akumal".into(),
            destino: "Playa del Carmen".into(),
            search_query: Some("Akumal beach".into()),
        };
        assert_eq!(key.query("Mexico guide"), "Akumal beach");

        key.search_query = Some("  ".into());
        assert_eq!(key.query("Mexico guide"), "Playa Akumal Playa del Carmen Mexico guide");
    }

    #[test]
    fn builtin_table_is_valid() {
        let curated = CuratedLinks::builtin().expect("builtin table");
        assert_eq!(curated.len(), 9);
        let ruta = curated.lookup("Ruta de los Cenotes - Puerto Morelos").unwrap();
        assert_eq!(ruta.len(), 3);
        assert!(curated.lookup("ruta de los cenotes - puerto morelos").is_none());
    }

    #[test]
    fn invalid_table_is_rejected() {
        let json = r#"{"X": [
            {"titulo": "a", "url": "https://same.example/1"},
            {"titulo": "b", "url": "https://same.example/2"}
        ]}"#;
        let err = CuratedLinks::from_json(json).unwrap_err();
        assert!(matches!(err, DestinosError::Validation { .. }));
    }

    #[tokio::test]
    async fn curated_resolver_returns_table_verbatim() {
        let curated = CuratedLinks::builtin().unwrap();
        let key = LinkKey {
            nombre: "Cenote Siete Bocas".into(),
            destino: String::new(),
            search_query: None,
        };
        let links = curated.resolve(&key).await.into_links();
        assert_eq!(links, curated.lookup("Cenote Siete Bocas").unwrap());

        let unknown = LinkKey {
            nombre: "Nowhere".into(),
            ..key
        };
        assert_eq!(curated.resolve(&unknown).await, Resolution::Links(vec![]));
    }

    #[tokio::test]
    async fn dynamic_resolver_filters_candidates() {
        let source = Fixed(vec![
            cand("Google", "https://www.google.com/search?q=x"),
            cand("Guide", "https://guide.example/akumal"),
        ]);
        let resolver = DynamicResolver::new(source, &fast_config());
        let key = LinkKey {
            nombre: "Playa Akumal".into(),
            destino: "Playa del Carmen".into(),
            search_query: None,
        };
        let links = resolver.resolve(&key).await.into_links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://guide.example/akumal");
    }

    #[tokio::test]
    async fn dynamic_resolver_failure_is_a_value() {
        let key = LinkKey {
            nombre: "X".into(),
            destino: String::new(),
            search_query: None,
        };

        let resolution = DynamicResolver::new(Broken, &fast_config()).resolve(&key).await;
        assert!(resolution.is_failed());
        assert!(resolution.into_links().is_empty());

        let resolution = DynamicResolver::new(Slow, &fast_config()).resolve(&key).await;
        assert!(matches!(resolution, Resolution::Failed { ref reason } if reason.contains("timed out")));
    }

    #[tokio::test]
    async fn dynamic_resolver_uses_seed_query() {
        let resolver = DynamicResolver::new(Recording::default(), &fast_config());
        let key = LinkKey {
            nombre: "Cenote Verde Lucero".into(),
            destino: "Playa del Carmen".into(),
            search_query: Some("Verde Lucero cenote zipline".into()),
        };
        resolver.resolve(&key).await;
        assert_eq!(resolver.source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*resolver.source.last.lock().unwrap(), "Verde Lucero cenote zipline");
    }
}
