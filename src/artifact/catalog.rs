//! Product catalog read from the inventory page object.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::errors::ArtifactError;

// `key: { ... name: '...' ... },` entries of the STORE_PRODUCTS object.
static PRODUCT_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([a-zA-Z0-9]+):\s*\{[\s\S]*?name:\s*'([^']+)'[\s\S]*?\},").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCatalog {
    entries: Vec<CatalogEntry>,
}

impl ProductCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Parse the product object literal out of page-object source.
    pub fn parse(source: &str) -> Result<Self, ArtifactError> {
        let entries: Vec<CatalogEntry> = PRODUCT_ENTRY
            .captures_iter(source)
            .map(|caps| CatalogEntry {
                key: caps[1].to_string(),
                name: caps[2].to_string(),
            })
            .collect();
        if entries.is_empty() {
            return Err(ArtifactError::Catalog("no products found in catalog source".to_string()));
        }
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let source = std::fs::read_to_string(path).map_err(|e| ArtifactError::io(path, e))?;
        Self::parse(&source)
            .map_err(|_| ArtifactError::Catalog(format!("no products found in {}", path.display())))
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive lookup by display name.
    pub fn find_by_name(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Deterministic pair of distinct product keys for a seed.
    ///
    /// `first = seed mod N`, `second = (seed + 3) mod N`, bumped to the next
    /// index when both land on the same product.
    pub fn choose_two_keys(&self, seed: u64) -> Result<(String, String), ArtifactError> {
        let n = self.entries.len() as u64;
        if n < 2 {
            return Err(ArtifactError::Catalog(
                "at least two products are required in the catalog".to_string(),
            ));
        }
        let first = seed % n;
        let mut second = (first + 3) % n;
        if second == first {
            second = (first + 1) % n;
        }
        Ok((
            self.entries[first as usize].key.clone(),
            self.entries[second as usize].key.clone(),
        ))
    }
}
