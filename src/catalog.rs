use std::collections::HashMap;
use std::io;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use ulid::Ulid;

use crate::model::{CategoryRef, ItemRef};

/// The slice of the product catalog reconciliation needs.
///
/// `None` means the reference does not resolve; callers treat that as an empty
/// contribution, never as a failure.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn items_in_category(&self, category: CategoryRef) -> Option<Vec<ItemRef>>;
    async fn item_identifier(&self, item: ItemRef) -> Option<String>;
    /// Human-readable name for an item identifier, used when generating list titles.
    async fn display_name(&self, code: &str) -> Option<String>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogItem {
    pub id: ItemRef,
    pub code: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogCategory {
    pub id: CategoryRef,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub items: Vec<ItemRef>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    items: Vec<CatalogItem>,
    #[serde(default)]
    categories: Vec<CatalogCategory>,
}

/// In-memory catalog, built programmatically or loaded from a JSON file of
/// `{"items": [...], "categories": [...]}`.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    items: HashMap<ItemRef, CatalogItem>,
    by_code: HashMap<String, ItemRef>,
    categories: HashMap<CategoryRef, Vec<ItemRef>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> io::Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut catalog = Self::new();
        for item in file.items {
            catalog.add_item(item.id, item.code, item.title);
        }
        for category in file.categories {
            catalog.add_category(category.id, category.items);
        }
        Ok(catalog)
    }

    pub fn from_json_file(path: &Path) -> io::Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    pub fn add_item(&mut self, id: ItemRef, code: impl Into<String>, title: impl Into<String>) {
        let code = code.into();
        self.by_code.insert(code.clone(), id);
        self.items.insert(
            id,
            CatalogItem {
                id,
                code,
                title: title.into(),
            },
        );
    }

    pub fn add_category(&mut self, id: CategoryRef, items: Vec<ItemRef>) {
        self.categories.insert(id, items);
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn item_by_code(&self, code: &str) -> Option<&CatalogItem> {
        self.by_code.get(code).and_then(|id| self.items.get(id))
    }
}

#[async_trait]
impl CatalogLookup for StaticCatalog {
    async fn items_in_category(&self, category: CategoryRef) -> Option<Vec<ItemRef>> {
        self.categories.get(&category).cloned()
    }

    async fn item_identifier(&self, item: ItemRef) -> Option<String> {
        self.items.get(&item).map(|i| i.code.clone())
    }

    async fn display_name(&self, code: &str) -> Option<String> {
        self.item_by_code(code).map(|i| i.title.clone())
    }
}
