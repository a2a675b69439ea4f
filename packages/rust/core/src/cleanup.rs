//! Description cleanup for text pasted from chat and search tools.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, instrument};

use destinos_shared::EnrichedDocument;

/// `[oai_citation:N‡domain]`, optionally followed by a `(url)` target. The
/// dagger sometimes arrives double-encoded as `â€¡`.
static CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[oai_citation:\d+(?:‡|â€¡)[^\]]*\](?:\([^)]*\))?").unwrap()
});

/// Markdown inline link `[text](url)`.
static MARKDOWN_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap());

/// Strip citation artifacts and markdown link syntax, then trim.
pub fn clean_text(text: &str) -> String {
    let without_citations = CITATION_RE.replace_all(text, "");
    let without_links = MARKDOWN_LINK_RE.replace_all(&without_citations, "$1");
    without_links.trim().to_string()
}

/// Clean every `descripcion` in place. Returns how many changed.
///
/// Only `descripcion` is touched; derived fields keep whatever the last
/// enrichment wrote.
#[instrument(skip_all, fields(places = doc.places.len()))]
pub fn clean_descriptions(doc: &mut EnrichedDocument) -> usize {
    let mut changed = 0;
    for place in &mut doc.places {
        let cleaned = clean_text(&place.descripcion);
        if cleaned != place.descripcion {
            debug!(nombre = %place.nombre, "description cleaned");
            place.descripcion = cleaned;
            changed += 1;
        }
    }
    info!(changed, "description cleanup complete");
    changed
}
