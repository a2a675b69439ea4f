//! Enrichment pipeline: merge → flatten → classify → requirements → links.
//!
//! Link lookups run as tokio tasks bounded by a semaphore. Every other step
//! is pure and runs on the calling task, which is also the only place that
//! writes to a [`Place`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use destinos_shared::{
    Catalog, Category, DOCUMENT_VERSION, EnrichedDocument, Enrichment, Place,
};

use crate::classifier::classify;
use crate::links::{CuratedLinks, LinkKey, LinkResolver, Resolution, normalize_links};
use crate::requirements;

// ---------------------------------------------------------------------------
// Options / report / progress
// ---------------------------------------------------------------------------

/// Which places get a link lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPolicy {
    Never,
    /// Every Nth place, counting from 1.
    Every(u32),
    All,
}

impl LinkPolicy {
    /// Map the `crawl_every` config value: 0 = never, 1 = all.
    pub fn from_crawl_every(n: u32) -> Self {
        match n {
            0 => Self::Never,
            1 => Self::All,
            n => Self::Every(n),
        }
    }

    /// Whether the place at 1-based position `counter` is looked up.
    pub fn selects(&self, counter: usize) -> bool {
        match *self {
            Self::Never => false,
            Self::All => true,
            Self::Every(0) => false,
            Self::Every(n) => counter % n as usize == 0,
        }
    }
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self::Every(5)
    }
}

/// Knobs for one enrichment run.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub policy: LinkPolicy,
    /// Maximum concurrent link lookups.
    pub concurrency: usize,
    /// Date stamped into the document metadata.
    pub enriched_at: NaiveDate,
    /// Version stamped into the document metadata.
    pub version: String,
}

impl EnrichOptions {
    pub fn new(enriched_at: NaiveDate) -> Self {
        Self {
            policy: LinkPolicy::default(),
            concurrency: 4,
            enriched_at,
            version: DOCUMENT_VERSION.to_string(),
        }
    }
}

/// Summary of an enrichment run.
#[derive(Debug, Clone, Default)]
pub struct EnrichReport {
    pub total_places: usize,
    /// Places a link lookup was attempted for.
    pub links_requested: usize,
    /// Lookups that produced at least one link.
    pub links_resolved: usize,
    /// Lookups that failed (error, timeout, task panic).
    pub links_failed: usize,
    /// Places that end the run with a non-empty `links_utiles`.
    pub places_with_links: usize,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each place has been written back.
    fn place_enriched(&self, nombre: &str, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, report: &EnrichReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn place_enriched(&self, _nombre: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &EnrichReport) {}
}

// ---------------------------------------------------------------------------
// Merge / flatten
// ---------------------------------------------------------------------------

/// Merge `additions` into `base`, categoria by categoria.
///
/// A categoria present in both is replaced wholesale by the addition. New
/// destinos and categorias are appended after the existing ones.
pub fn merge(base: &mut Catalog, additions: Catalog) {
    for (destino, categorias) in additions.destinos {
        let target = base
            .destinos
            .get_or_insert_with(&destino, Default::default);
        for (categoria, category) in categorias {
            if target.insert(categoria.as_str(), category).is_some() {
                debug!(%destino, %categoria, "categoria replaced by addition");
            }
        }
    }
}

/// Walk the catalog in order and produce one flat list, tagging each place
/// with its `destino`, `categoria` and (for nested categories) `subcategoria`.
pub fn flatten(catalog: &Catalog) -> Vec<Place> {
    let mut out: Vec<Place> = Vec::with_capacity(catalog.place_count());
    let mut seen: HashSet<String> = HashSet::new();

    for (destino, categorias) in catalog.destinos.iter() {
        for (categoria, category) in categorias.iter() {
            let groups: Vec<(Option<&str>, &Vec<Place>)> = match category {
                Category::Flat(places) => vec![(None, places)],
                Category::Nested(themes) => themes
                    .iter()
                    .map(|(sub, places)| (Some(sub), places))
                    .collect(),
            };

            for (subcategoria, places) in groups {
                for place in places {
                    let mut place = place.clone();
                    place.destino = destino.to_string();
                    place.categoria = categoria.to_string();
                    place.subcategoria = subcategoria.map(str::to_string);

                    if !seen.insert(place.nombre.clone()) {
                        warn!(nombre = %place.nombre, %destino, %categoria, "duplicate place name");
                    }
                    out.push(place);
                }
            }
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

/// Derived fields for one place. `resolution` replaces the place's links
/// only when it produced some; otherwise the links the place already carries
/// are kept, deduplicated by host and capped.
pub fn enrich_place(place: &Place, resolution: Option<Resolution>) -> Enrichment {
    let intensidad = classify(&place.descripcion, &place.nombre);
    let requisitos = requirements::generate(place, intensidad);
    let links = resolution
        .map(Resolution::into_links)
        .filter(|links| !links.is_empty())
        .unwrap_or_else(|| normalize_links(&place.links_utiles));

    Enrichment {
        intensidad,
        requisitos,
        links: Some(links),
    }
}

/// Enrich a flat list of places.
#[instrument(skip_all, fields(places = places.len(), policy = ?options.policy))]
pub async fn enrich_places<R>(
    places: Vec<Place>,
    resolver: Arc<R>,
    options: &EnrichOptions,
    progress: &dyn ProgressReporter,
) -> (Vec<Place>, EnrichReport)
where
    R: LinkResolver + 'static,
{
    let start = Instant::now();
    let total = places.len();
    let mut report = EnrichReport {
        total_places: total,
        ..EnrichReport::default()
    };

    // --- Phase 1: Link lookups ---
    progress.phase("Resolving links");
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut handles = Vec::new();

    for (idx, place) in places.iter().enumerate() {
        if !options.policy.selects(idx + 1) {
            continue;
        }

        let key = LinkKey::from_place(place);
        let resolver = Arc::clone(&resolver);
        let sem = Arc::clone(&semaphore);

        handles.push((
            idx,
            tokio::spawn(async move {
                let Ok(_permit) = sem.acquire().await else {
                    return Resolution::failed("lookup pool closed");
                };
                resolver.resolve(&key).await
            }),
        ));
    }
    report.links_requested = handles.len();

    // Collect results
    let mut resolutions: Vec<Option<Resolution>> = vec![None; total];
    for (idx, handle) in handles {
        let resolution = match handle.await {
            Ok(resolution) => resolution,
            Err(e) => {
                warn!(nombre = %places[idx].nombre, error = %e, "link task failed");
                Resolution::failed(format!("link task failed: {e}"))
            }
        };

        match &resolution {
            Resolution::Failed { .. } => report.links_failed += 1,
            Resolution::Links(links) if !links.is_empty() => report.links_resolved += 1,
            Resolution::Links(_) => {}
        }
        resolutions[idx] = Some(resolution);
    }

    // --- Phase 2: Classify + write back ---
    progress.phase("Classifying places");
    let mut enriched: Vec<Place> = Vec::with_capacity(total);
    for (idx, (mut place, resolution)) in places.into_iter().zip(resolutions).enumerate() {
        let enrichment = enrich_place(&place, resolution);
        place.apply(enrichment);

        if !place.links_utiles.is_empty() {
            report.places_with_links += 1;
        }
        progress.place_enriched(&place.nombre, idx + 1, total);
        enriched.push(place);
    }

    report.elapsed = start.elapsed();
    (enriched, report)
}

/// Full run: merge the additions into `base`, flatten, enrich.
#[instrument(skip_all, fields(additions = additions.len()))]
pub async fn run<R>(
    mut base: Catalog,
    additions: Vec<Catalog>,
    resolver: Arc<R>,
    options: &EnrichOptions,
    progress: &dyn ProgressReporter,
) -> (EnrichedDocument, EnrichReport)
where
    R: LinkResolver + 'static,
{
    progress.phase("Merging catalogs");
    for addition in additions {
        merge(&mut base, addition);
    }

    let places = flatten(&base);
    info!(
        destinos = base.destinos.len(),
        places = places.len(),
        "catalog merged"
    );

    let (places, report) = enrich_places(places, resolver, options, progress).await;
    let doc = EnrichedDocument::new(places, options.enriched_at).with_version(&options.version);

    log_report(&report);
    progress.done(&report);
    (doc, report)
}

/// Re-run enrichment on an already flat document. Extra metadata keys survive.
#[instrument(skip_all, fields(places = doc.places.len()))]
pub async fn refresh<R>(
    mut doc: EnrichedDocument,
    resolver: Arc<R>,
    options: &EnrichOptions,
    progress: &dyn ProgressReporter,
) -> (EnrichedDocument, EnrichReport)
where
    R: LinkResolver + 'static,
{
    let places = std::mem::take(&mut doc.places);
    let (places, report) = enrich_places(places, resolver, options, progress).await;
    doc.places = places;
    doc.restamp(options.enriched_at, &options.version);

    log_report(&report);
    progress.done(&report);
    (doc, report)
}

/// Set `links_utiles` on every place whose name is in `curated`. Nothing
/// else on any place is touched. Returns the number of places patched.
#[instrument(skip_all, fields(places = doc.places.len(), curated = curated.len()))]
pub fn attach_links(doc: &mut EnrichedDocument, curated: &CuratedLinks) -> usize {
    let mut patched = 0;
    for place in &mut doc.places {
        if let Some(links) = curated.lookup(&place.nombre) {
            debug!(nombre = %place.nombre, links = links.len(), "curated links attached");
            place.links_utiles = links.to_vec();
            patched += 1;
        }
    }
    info!(patched, "curated links attached");
    patched
}

fn log_report(report: &EnrichReport) {
    info!(
        total_places = report.total_places,
        links_requested = report.links_requested,
        links_resolved = report.links_resolved,
        links_failed = report.links_failed,
        places_with_links = report.places_with_links,
        elapsed_ms = report.elapsed.as_millis(),
        "enrichment complete"
    );
}
