//! List membership reconciliation.
//!
//! A list's membership is whatever `canonical_codes` says. Every save folds the
//! list's transient inputs into it, in a fixed order:
//!
//! 1. pending adds, 2. manual codes, 3. pending removes (then the queues are
//! cleared), 4. title, 5. category expansion, 6. other lists.
//!
//! Removal runs before the derived expansions: an item removed by hand comes back
//! in the same save if a category or list rule still matches it.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};
use ulid::Ulid;

use crate::catalog::CatalogLookup;
use crate::codec::{ItemSet, ItemSetCodec};
use crate::datastore::Datastore;
use crate::engine::EngineError;
use crate::inflight::InFlight;
use crate::limits::*;
use crate::model::*;
use crate::observability::{DANGLING_REFERENCES_TOTAL, LISTS_RECONCILED_TOTAL};
use crate::title::{default_title, slugify, with_suffix, DEFAULT_TITLE_TEMPLATE};

pub struct ListMembershipResolver {
    store: Arc<dyn Datastore>,
    catalog: Arc<dyn CatalogLookup>,
    codec: ItemSetCodec,
    title_template: String,
    inflight: InFlight,
}

impl ListMembershipResolver {
    pub fn new(store: Arc<dyn Datastore>, catalog: Arc<dyn CatalogLookup>, codec: ItemSetCodec) -> Self {
        Self {
            store,
            catalog,
            codec,
            title_template: DEFAULT_TITLE_TEMPLATE.to_string(),
            inflight: InFlight::new(),
        }
    }

    pub fn with_title_template(mut self, template: impl Into<String>) -> Self {
        self.title_template = template.into();
        self
    }

    pub fn codec(&self) -> &ItemSetCodec {
        &self.codec
    }

    /// Fold every transient input of `list` into its canonical codes.
    ///
    /// Does not persist. Idempotent once the one-shot queues are drained.
    pub async fn reconcile(&self, mut list: ProductList) -> Result<ProductList, EngineError> {
        if list.locked {
            debug!("list {} is locked, membership left as is", list.id);
            list.pending_add.clear();
            list.pending_remove.clear();
            let codes = self.codec.decode(&list.canonical_codes);
            list.title = self.generate_title(&list, &codes).await;
            list.title = self.unique_title(list.id, list.title).await?;
            metrics::counter!(LISTS_RECONCILED_TOTAL, "locked" => "true").increment(1);
            return Ok(list);
        }

        let mut codes = self.codec.decode(&list.canonical_codes);

        codes.union_with(&self.resolve_items(list.id, &list.pending_add).await);
        codes.union_with(&self.codec.decode(&list.manual_codes));
        list.manual_codes.clear();
        codes.subtract(&self.resolve_items(list.id, &list.pending_remove).await);
        list.pending_add.clear();
        list.pending_remove.clear();

        list.title = self.generate_title(&list, &codes).await;
        list.title = self.unique_title(list.id, list.title).await?;

        if !list.categories_to_add.is_empty() {
            let mut found = self.expand_categories(list.id, &list.categories_to_add).await;
            if !list.must_also_be_in_categories.is_empty() {
                let also_in = self
                    .expand_categories(list.id, &list.must_also_be_in_categories)
                    .await;
                found.intersect(&also_in);
            }
            debug!("list {}: {} items from categories", list.id, found.len());
            codes.union_with(&found);
            if !list.keep_adding_from_categories {
                list.categories_to_add.clear();
            }
        }

        if !list.lists_to_add.is_empty() {
            for other in &list.lists_to_add {
                if *other == list.id {
                    continue;
                }
                codes.union_with(&self.membership(*other).await?);
            }
            if !list.keep_adding_from_lists {
                list.lists_to_add.clear();
            }
        }

        if codes.len() > MAX_CODES_PER_LIST {
            return Err(EngineError::LimitExceeded("too many items in list"));
        }
        if codes.iter().any(|c| c.len() > MAX_CODE_LEN) {
            return Err(EngineError::LimitExceeded("item code too long"));
        }
        list.canonical_codes = self.codec.encode(&codes);
        metrics::counter!(LISTS_RECONCILED_TOTAL, "locked" => "false").increment(1);
        Ok(list)
    }

    /// The save hook: reconcile, then persist. Returns what was stored.
    ///
    /// A title claimed by a concurrent save between reconcile and persist is
    /// disambiguated once more before giving up with [`EngineError::TitleTaken`].
    pub async fn save_list(&self, list: ProductList) -> Result<ProductList, EngineError> {
        let _guard = self.inflight.try_enter(list.id)?;
        let mut list = self.reconcile(list).await?;
        match self.store.save_list(list.clone()).await {
            Err(EngineError::TitleTaken(title)) => {
                debug!("list {}: title {title:?} taken concurrently, retrying", list.id);
                list.title = self.unique_title(list.id, title).await?;
                self.store.save_list(list.clone()).await?;
            }
            result => result?,
        }
        debug!("saved list {} ({:?})", list.id, list.title);
        Ok(list)
    }

    /// Create and persist a new list holding `codes` (separator-delimited).
    pub async fn create_from_codes(&self, codes: &str) -> Result<ProductList, EngineError> {
        let mut list = ProductList::new(Ulid::new());
        list.manual_codes = codes.to_string();
        self.save_list(list).await
    }

    pub async fn delete_list(&self, id: Ulid) -> Result<(), EngineError> {
        let list = self.store.load_list(id).await?.ok_or(EngineError::NotFound(id))?;
        if !list.can_delete() {
            return Err(EngineError::Configuration(format!(
                "list {id} is locked and cannot be deleted"
            )));
        }
        self.store.delete_list(id).await
    }

    /// Current canonical membership of a list. A missing list has no members.
    pub async fn membership(&self, list_id: Ulid) -> Result<ItemSet, EngineError> {
        match self.store.load_list(list_id).await? {
            Some(list) => Ok(self.codec.decode(&list.canonical_codes)),
            None => {
                warn!("list {list_id} referenced but not found, treating as empty");
                metrics::counter!(DANGLING_REFERENCES_TOTAL, "kind" => "list").increment(1);
                Ok(ItemSet::new())
            }
        }
    }

    pub fn product_count(&self, list: &ProductList) -> usize {
        self.codec.decode(&list.canonical_codes).len()
    }

    /// `"{title} ({count} products)"`.
    pub fn full_name(&self, list: &ProductList) -> String {
        format!("{} ({} products)", list.title, self.product_count(list))
    }

    async fn resolve_items(&self, list_id: Ulid, items: &BTreeSet<ItemRef>) -> ItemSet {
        let mut codes = ItemSet::new();
        for item in items {
            match self.catalog.item_identifier(*item).await {
                Some(code) => {
                    if let Some(code) = self.codec.normalize(&code) {
                        codes.insert(code);
                    }
                }
                None => {
                    warn!("list {list_id}: item {item} not in catalog, skipped");
                    metrics::counter!(DANGLING_REFERENCES_TOTAL, "kind" => "item").increment(1);
                }
            }
        }
        codes
    }

    async fn expand_categories(&self, list_id: Ulid, categories: &BTreeSet<CategoryRef>) -> ItemSet {
        let mut codes = ItemSet::new();
        for category in categories {
            let Some(items) = self.catalog.items_in_category(*category).await else {
                warn!("list {list_id}: category {category} not in catalog, skipped");
                metrics::counter!(DANGLING_REFERENCES_TOTAL, "kind" => "category").increment(1);
                continue;
            };
            let items: BTreeSet<ItemRef> = items.into_iter().collect();
            codes.union_with(&self.resolve_items(list_id, &items).await);
        }
        codes
    }

    async fn generate_title(&self, list: &ProductList, codes: &ItemSet) -> String {
        let raw = if list.title.trim().is_empty() {
            let mut names: Vec<String> = Vec::new();
            let mut len = 0;
            for code in codes.iter() {
                if len > MAX_TITLE_LEN {
                    break;
                }
                if let Some(name) = self.display_name(code).await {
                    len += name.len() + 2;
                    names.push(name);
                }
            }
            if names.is_empty() {
                default_title(&self.title_template, list.id)
            } else {
                names.join("; ")
            }
        } else {
            list.title.clone()
        };

        let slug = slugify(&raw);
        if slug.is_empty() {
            default_title(&self.title_template, list.id)
        } else {
            slug
        }
    }

    /// Catalog name for a stored code, which may carry the escaped separator.
    async fn display_name(&self, code: &str) -> Option<String> {
        if let Some(name) = self.catalog.display_name(code).await {
            return Some(name);
        }
        let alternative = self.codec.alternative();
        if !code.contains(alternative) {
            return None;
        }
        let raw = code.replace(alternative, &self.codec.separator().to_string());
        self.catalog.display_name(&raw).await
    }

    async fn unique_title(&self, id: Ulid, title: String) -> Result<String, EngineError> {
        let mut candidate = title;
        let mut n = 2;
        loop {
            match self.store.find_list_by_title(&candidate).await? {
                Some(other) if other.id != id => {
                    if n > MAX_TITLE_ATTEMPTS {
                        return Err(EngineError::TitleCollisionExhausted(candidate));
                    }
                    candidate = with_suffix(&candidate, n);
                    n += 1;
                }
                _ => return Ok(candidate),
            }
        }
    }
}
