//! Page-keyed step content.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tourguide_core_types::{PageId, StepDescriptor, TourCatalog};
use tracing::debug;

use crate::errors::EngineError;

/// Supplies the steps for a page. An empty catalog keeps the engine inert.
pub trait CatalogProvider: Send + Sync {
    fn catalog(&self, page: &PageId) -> Arc<TourCatalog>;
}

/// On-disk layout: `pages: { "/route": [step, ...] }`.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    pages: BTreeMap<String, Vec<StepDescriptor>>,
}

/// Catalogs fixed at construction time.
#[derive(Debug, Default)]
pub struct StaticCatalogProvider {
    pages: HashMap<PageId, Arc<TourCatalog>>,
    empty: Arc<TourCatalog>,
}

impl StaticCatalogProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a page, replacing any catalog already registered under the same
    /// normalized id.
    pub fn with_page(mut self, page: impl Into<PageId>, catalog: TourCatalog) -> Self {
        self.pages
            .insert(page.into().normalized(), Arc::new(catalog));
        self
    }

    /// Parses YAML or JSON content.
    pub fn from_yaml_str(raw: &str) -> Result<Self, EngineError> {
        let file: CatalogFile = serde_yaml::from_str(raw).map_err(EngineError::parse)?;
        Self::from_file(file)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, EngineError> {
        let file: CatalogFile = serde_json::from_str(raw).map_err(EngineError::parse)?;
        Self::from_file(file)
    }

    /// Loads a catalog file; `.json` is parsed as JSON, everything else as YAML.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let raw = fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let provider = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&raw)?,
            _ => Self::from_yaml_str(&raw)?,
        };
        debug!(path = %path.display(), pages = provider.len(), "catalog loaded");
        Ok(provider)
    }

    fn from_file(file: CatalogFile) -> Result<Self, EngineError> {
        let mut pages = HashMap::with_capacity(file.pages.len());
        for (raw_page, steps) in file.pages {
            let page = PageId::new(raw_page.as_str()).normalized();
            let catalog = TourCatalog::new(steps).map_err(|source| EngineError::Catalog {
                page: raw_page.clone(),
                source,
            })?;
            if pages.insert(page.clone(), Arc::new(catalog)).is_some() {
                return Err(EngineError::DuplicatePage(page.0));
            }
        }
        Ok(Self {
            pages,
            empty: Arc::new(TourCatalog::empty()),
        })
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Registered pages in sorted order.
    pub fn pages(&self) -> Vec<PageId> {
        let mut pages: Vec<PageId> = self.pages.keys().cloned().collect();
        pages.sort();
        pages
    }
}

impl CatalogProvider for StaticCatalogProvider {
    fn catalog(&self, page: &PageId) -> Arc<TourCatalog> {
        self.pages
            .get(&page.normalized())
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.empty))
    }
}
