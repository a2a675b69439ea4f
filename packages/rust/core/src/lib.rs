//! Enrichment logic for the Destinos catalog.
//!
//! This crate ties the pieces together: the keyword classifier, the
//! requirement generator, link resolution, and the merge/enrich pipeline
//! that writes every derived field back onto a [`destinos_shared::Place`].

pub mod classifier;
pub mod cleanup;
pub mod links;
pub mod pipeline;
pub mod requirements;
pub mod seed;

pub use classifier::classify;
pub use cleanup::clean_descriptions;
pub use links::{CuratedLinks, DynamicResolver, LinkKey, LinkResolver, Resolution};
pub use pipeline::{
    EnrichOptions, EnrichReport, LinkPolicy, ProgressReporter, SilentProgress, attach_links,
    enrich_places, flatten, merge, refresh, run,
};
