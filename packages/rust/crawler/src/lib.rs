//! Link-source capability for the enrichment pipeline.
//!
//! This crate provides:
//! - [`LinkSource`]: the opaque "query in, candidate links out" capability
//! - [`SearchClient`]: an HTTP implementation that scrapes a search page

use std::future::Future;

use destinos_shared::{Link, Result};

pub mod engine;

pub use engine::SearchClient;

/// Anything that can turn a free-text query into candidate links.
///
/// Candidates come back in source order, unfiltered. An `Err` means the
/// source itself failed; an empty `Ok` means it answered with nothing.
pub trait LinkSource: Send + Sync {
    fn search(&self, query: &str) -> impl Future<Output = Result<Vec<Link>>> + Send;
}
