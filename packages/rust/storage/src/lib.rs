//! JSON catalog store.
//!
//! Source catalogs (nested destino → categoria shape) are read-only inputs.
//! The enriched document is the one file this crate writes, and it is always
//! replaced atomically: serialize to a sibling temp file, flush, then rename
//! over the target. A failed run leaves either the previous file or nothing.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use destinos_shared::{Catalog, DestinosError, EnrichedDocument, Result};

/// Handle to the persisted enriched document.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the flat `{metadata, places}` document.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn load_document(&self) -> Result<EnrichedDocument> {
        let doc: EnrichedDocument = load_json(&self.path)?;
        debug!(places = doc.places.len(), "loaded enriched document");
        Ok(doc)
    }

    /// Replace the document on disk with `doc`.
    #[instrument(skip_all, fields(path = %self.path.display(), places = doc.places.len()))]
    pub fn save_document(&self, doc: &EnrichedDocument) -> Result<()> {
        write_json_atomic(&self.path, doc)?;
        info!("enriched document written");
        Ok(())
    }
}

/// Read a nested source catalog.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let catalog: Catalog = load_json(path)?;
    debug!(
        path = %path.display(),
        destinos = catalog.destinos.len(),
        places = catalog.place_count(),
        "loaded catalog"
    );
    Ok(catalog)
}

/// Read and deserialize any JSON file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| DestinosError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| DestinosError::parse(format!("{}: {e}", path.display())))
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
///
/// Non-ASCII text is written literally, so accented names stay diffable.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value)
        .map_err(|e| DestinosError::Storage(format!("failed to serialize document: {e}")))?;
    content.push('\n');

    let file_name = path
        .file_name()
        .ok_or_else(|| DestinosError::Storage(format!("not a file path: {}", path.display())))?
        .to_string_lossy();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let temp = dir.join(format!(".{file_name}.{}.tmp", Uuid::now_v7()));

    // Write to temp file first
    if let Err(e) = write_and_sync(&temp, content.as_bytes()) {
        let _ = std::fs::remove_file(&temp);
        return Err(e);
    }

    // Atomic rename
    if let Err(e) = std::fs::rename(&temp, path) {
        warn!(path = %path.display(), error = %e, "atomic replace failed, discarding temp file");
        let _ = std::fs::remove_file(&temp);
        return Err(DestinosError::io(path, e));
    }

    Ok(())
}

fn write_and_sync(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| DestinosError::io(path, e))?;
    file.write_all(bytes).map_err(|e| DestinosError::io(path, e))?;
    file.sync_all().map_err(|e| DestinosError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use destinos_shared::{Enrichment, Intensidad, Place};

    fn temp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("destinos-{label}-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_document() -> EnrichedDocument {
        let mut place = Place::new("Playa El Cielo", "Solo accesible por lancha.")
            .with_categoria("lado_este_salvaje")
            .with_destino("Cozumel");
        place.apply(Enrichment {
            intensidad: Intensidad::new(1, 0, 0),
            requisitos: vec!["⛵ Transporte en lancha/barco incluido".into()],
            links: None,
        });
        let date = chrono::NaiveDate::from_ymd_opt(2025, 10, 2).unwrap();
        EnrichedDocument::new(vec![place], date)
    }

    #[test]
    fn save_then_load_document() {
        let dir = temp_dir("store");
        let store = CatalogStore::new(dir.join("enriched-places.json"));
        assert!(!store.exists());

        let doc = sample_document();
        store.save_document(&doc).expect("save");
        assert!(store.exists());

        let loaded = store.load_document().expect("load");
        assert_eq!(loaded, doc);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("Transporte en lancha"), "non-ASCII written literally");
        assert!(raw.ends_with('\n'));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let dir = temp_dir("store-temp");
        let store = CatalogStore::new(dir.join("out.json"));
        store.save_document(&sample_document()).unwrap();
        store.save_document(&sample_document()).unwrap();

        let names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["out.json".to_string()]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn failed_replace_keeps_target_and_cleans_up() {
        let dir = temp_dir("store-fail");
        // A directory where the file should go makes the rename fail.
        let target = dir.join("enriched-places.json");
        std::fs::create_dir_all(target.join("occupied")).unwrap();

        let err = CatalogStore::new(&target)
            .save_document(&sample_document())
            .unwrap_err();
        assert!(matches!(err, DestinosError::Io { .. }));
        assert!(target.join("occupied").is_dir());

        let leftovers = std::fs::read_dir(&dir)
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(".tmp")
            })
            .count();
        assert_eq!(leftovers, 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let path = std::env::temp_dir()
            .join(format!("destinos-missing-{}", Uuid::now_v7()))
            .join("out.json");
        let err = write_json_atomic(&path, &sample_document()).unwrap_err();
        assert!(matches!(err, DestinosError::Io { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn load_catalog_reports_parse_errors_with_path() {
        let dir = temp_dir("store-parse");
        let path = dir.join("data.json");
        std::fs::write(&path, r#"{"Cancún": {"playas": "not a list"}}"#).unwrap();

        let err = load_catalog(&path).unwrap_err();
        assert!(matches!(err, DestinosError::Parse { .. }));
        assert!(err.to_string().contains("data.json"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_catalog_reads_nested_shape() {
        let dir = temp_dir("store-catalog");
        let path = dir.join("data.json");
        std::fs::write(
            &path,
            r#"{"Cancún": {"playas": [{"nombre": "Playa Delfines", "descripcion": "Mirador"}]}}"#,
        )
        .unwrap();

        let catalog = load_catalog(&path).unwrap();
        assert_eq!(catalog.place_count(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
