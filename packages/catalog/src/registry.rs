//! Region registry: the static set of named bounding boxes.
//!
//! The default registry is baked into the binary at compile time via
//! [`include_str!`]. A replacement can be loaded from any TOML file with
//! the same `[[regions]]` layout.

use std::collections::BTreeSet;
use std::path::Path;

use quake_forecast_catalog_models::Region;
use serde::Deserialize;

use crate::CatalogError;

/// Default registry embedded at compile time.
const DEFAULT_REGIONS_TOML: &str = include_str!("../regions/default.toml");

/// Number of regions in the embedded registry (used in tests).
#[cfg(test)]
const EXPECTED_REGION_COUNT: usize = 16;

#[derive(Debug, Deserialize)]
struct RegistryFile {
    regions: Vec<Region>,
}

/// An ordered, validated collection of [`Region`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRegistry {
    regions: Vec<Region>,
}

impl RegionRegistry {
    /// Returns the embedded default registry.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed. It is a compile-time
    /// constant, so this indicates a development error caught by tests.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_toml_str(DEFAULT_REGIONS_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded region registry: {e}"))
    }

    /// Parses and validates a registry from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Toml`] on syntax errors and
    /// [`CatalogError::Registry`] on empty, duplicate or invalid entries.
    pub fn from_toml_str(s: &str) -> Result<Self, CatalogError> {
        let file: RegistryFile = toml::from_str(s)?;
        Self::new(file.regions)
    }

    /// Reads a registry file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read, otherwise
    /// the same errors as [`Self::from_toml_str`].
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        log::info!("Loading region registry from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validates a list of regions.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Registry`] if the list is empty, an id or
    /// name is blank, an id is repeated (case-insensitively), or a
    /// bounding box is invalid.
    pub fn new(regions: Vec<Region>) -> Result<Self, CatalogError> {
        if regions.is_empty() {
            return Err(CatalogError::Registry {
                message: "no regions defined".to_string(),
            });
        }

        let mut seen = BTreeSet::new();
        for region in &regions {
            if region.id.trim().is_empty() || region.name.trim().is_empty() {
                return Err(CatalogError::Registry {
                    message: "region with empty id or name".to_string(),
                });
            }
            if !seen.insert(region.id.to_ascii_lowercase()) {
                return Err(CatalogError::Registry {
                    message: format!("duplicate region id '{}'", region.id),
                });
            }
            region.bounds.validate().map_err(|e| CatalogError::Registry {
                message: format!("region '{}': {e}", region.id),
            })?;
        }

        Ok(Self { regions })
    }

    /// Looks up a region by id, ignoring ASCII case.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Region> {
        let id = id.trim();
        self.regions.iter().find(|r| r.id.eq_ignore_ascii_case(id))
    }

    /// All regions in registry order.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Number of regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the registry holds no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl Default for RegionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
