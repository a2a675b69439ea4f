//! Shared types, error model, and configuration for Destinos.
//!
//! This crate is the foundation depended on by all other Destinos crates.
//! It provides:
//! - [`DestinosError`]: the unified error type
//! - Domain types ([`Place`], [`Catalog`], [`EnrichedDocument`], [`Link`])
//! - Configuration ([`AppConfig`], [`ResolverConfig`], config loading)

pub mod config;
pub mod error;
pub mod ordered;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, LinksConfig, ResolverConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{DestinosError, Result};
pub use ordered::OrderedMap;
pub use types::{
    Accesibilidad, Catalog, Category, DOCUMENT_VERSION, Destination, DocumentMetadata,
    EnrichedDocument, Enrichment, Intensidad, Link, MAX_LEVEL, MAX_LINKS, Place, validate_links,
};
