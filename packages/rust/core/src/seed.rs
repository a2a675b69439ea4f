//! Built-in addition collections merged on top of the base catalog.

use destinos_shared::{Catalog, DestinosError, Result};

const ADDITIONAL_LOCATIONS: &str = include_str!("../data/additional_locations.json");

/// Riviera Maya locations missing from older base catalogs: Isla Mujeres,
/// Akumal, the Puerto Morelos cenote route, and Cozumel's east side.
pub fn additional_locations() -> Result<Catalog> {
    serde_json::from_str(ADDITIONAL_LOCATIONS)
        .map_err(|e| DestinosError::parse(format!("built-in additional locations: {e}")))
}
