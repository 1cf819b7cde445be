use crate::error::ItemError;
use crate::models::{GeoPoint, Item, ItemCategory, ItemUpdate, NewItem, SearchFilters, SearchResults};
use crate::search::codec::{decode_item, new_item_fields, update_fields};
use crate::search::query::{apply_distance_pass, build_search_query, ITEMS};
use crate::store::{Cursor, Direction, DocumentStore, Predicate, Query, Snapshot};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Page size used by category browsing
const CATEGORY_PAGE_SIZE: usize = 20;

/// Item operations over a shared document store handle.
/// Each call is independent; the service holds no state of its own.
#[derive(Clone)]
pub struct ItemQueryService {
    store: Arc<dyn DocumentStore>,
}

impl ItemQueryService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Search items with filters, returning one page.
    ///
    /// Page `n` skips the `(n - 1) * page_size` records before it. `total` is
    /// the number of items on this page that survived radius filtering.
    pub async fn search(
        &self,
        filters: &SearchFilters,
        origin: Option<GeoPoint>,
        page: usize,
        page_size: usize,
    ) -> Result<SearchResults, ItemError> {
        let query = build_search_query(filters, page, page_size);
        self.run_search(filters, origin, query).await
    }

    /// Search items resuming strictly after `cursor`, as returned in
    /// [`SearchResults::next_cursor`] of the previous page
    pub async fn search_after(
        &self,
        filters: &SearchFilters,
        origin: Option<GeoPoint>,
        cursor: Cursor,
        page_size: usize,
    ) -> Result<SearchResults, ItemError> {
        let query = build_search_query(filters, 1, page_size).start_after(cursor);
        self.run_search(filters, origin, query).await
    }

    async fn run_search(
        &self,
        filters: &SearchFilters,
        origin: Option<GeoPoint>,
        query: Query,
    ) -> Result<SearchResults, ItemError> {
        debug!(
            "Searching {} with {} predicates via {}",
            query.collection,
            query.predicates.len(),
            self.store.backend_name()
        );

        let snapshots = self.store.query(&query).await?;

        // A short page means the store has nothing further
        let next_cursor = match (query.limit, snapshots.last()) {
            (Some(limit), Some(last)) if snapshots.len() >= limit => Some(query.cursor_for(last)),
            _ => None,
        };

        let items = decode_items(&snapshots)?;
        let fetched = items.len();
        let items = apply_distance_pass(items, filters, origin);

        info!(
            "Search returned {} items ({} fetched before radius filtering)",
            items.len(),
            fetched
        );

        Ok(SearchResults {
            total: items.len(),
            items,
            next_cursor,
        })
    }

    /// Get item by id. A missing item is `Ok(None)`.
    pub async fn get_item(&self, item_id: &str) -> Result<Option<Item>, ItemError> {
        let snapshot = self.store.get(ITEMS, item_id).await?;
        Ok(snapshot.as_ref().map(decode_item).transpose()?)
    }

    /// All items listed by a lessor, newest first
    pub async fn items_by_lessor(&self, lessor_id: &str) -> Result<Vec<Item>, ItemError> {
        let query = Query::new(ITEMS)
            .filter(Predicate::eq("lessorId", lessor_id))
            .order_by("createdAt", Direction::Descending);

        let snapshots = self.store.query(&query).await?;
        decode_items(&snapshots)
    }

    /// Newest available items of a category
    pub async fn items_by_category(&self, category: ItemCategory) -> Result<Vec<Item>, ItemError> {
        let query = Query::new(ITEMS)
            .filter(Predicate::eq("category", category.as_str()))
            .filter(Predicate::eq("isAvailable", true))
            .order_by("createdAt", Direction::Descending)
            .limit(CATEGORY_PAGE_SIZE);

        let snapshots = self.store.query(&query).await?;
        decode_items(&snapshots)
    }

    /// List a new item for `lessor_id`
    pub async fn create_item(&self, new_item: &NewItem, lessor_id: &str) -> Result<Item, ItemError> {
        let fields = new_item_fields(new_item, lessor_id, Utc::now())?;
        let id = self.store.create(ITEMS, fields.clone()).await?;
        info!("Created item {} for lessor {}", id, lessor_id);

        Ok(decode_item(&Snapshot::new(id, fields))?)
    }

    /// Apply a partial edit. Only the owning lessor may update an item.
    pub async fn update_item(
        &self,
        item_id: &str,
        update: &ItemUpdate,
        user_id: &str,
    ) -> Result<Item, ItemError> {
        self.owned_item(item_id, user_id).await?;

        let fields = update_fields(update, Utc::now())?;
        self.store.update(ITEMS, item_id, fields).await?;

        self.get_item(item_id)
            .await?
            .ok_or_else(|| ItemError::NotFound(item_id.to_string()))
    }

    /// Remove an item. Only the owning lessor may delete it.
    pub async fn delete_item(&self, item_id: &str, user_id: &str) -> Result<(), ItemError> {
        self.owned_item(item_id, user_id).await?;
        self.store.delete(ITEMS, item_id).await?;
        info!("Deleted item {}", item_id);
        Ok(())
    }

    /// Bump the view counter. Best effort: failures are logged, never returned.
    pub async fn increment_view_count(&self, item_id: &str) {
        if let Err(e) = self.store.increment(ITEMS, item_id, "viewCount", 1).await {
            error!("Failed to increment view count for {}: {}", item_id, e);
        }
    }

    async fn owned_item(&self, item_id: &str, user_id: &str) -> Result<Item, ItemError> {
        let item = self
            .get_item(item_id)
            .await?
            .ok_or_else(|| ItemError::NotFound(item_id.to_string()))?;

        if item.lessor_id != user_id {
            return Err(ItemError::NotAuthorized {
                item_id: item_id.to_string(),
                user_id: user_id.to_string(),
            });
        }
        Ok(item)
    }
}

fn decode_items(snapshots: &[Snapshot]) -> Result<Vec<Item>, ItemError> {
    snapshots
        .iter()
        .map(|snapshot| decode_item(snapshot).map_err(ItemError::from))
        .collect()
}
