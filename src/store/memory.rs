use crate::error::StoreError;
use crate::store::traits::DocumentStore;
use crate::store::types::{FieldValue, Fields, Query, Snapshot};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Mutex, RwLock};
use tracing::debug;

type Collections = HashMap<String, BTreeMap<String, Fields>>;

/// In-process document store with the same query semantics as the hosted one.
///
/// Every issued query is recorded, and a failure can be injected so that all
/// subsequent calls report it.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    next_id: AtomicU64,
    failure: RwLock<Option<String>>,
    issued: Mutex<Vec<Query>>,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("memory store lock poisoned".to_string())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document under a caller-chosen id
    pub fn insert(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    /// Make every following call fail with `message`
    pub fn fail_with(&self, message: &str) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = Some(message.to_string());
        }
    }

    pub fn recover(&self) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = None;
        }
    }

    /// Queries received so far, oldest first
    pub fn issued_queries(&self) -> Vec<Query> {
        self.issued.lock().map(|q| q.clone()).unwrap_or_default()
    }

    fn check_failure(&self) -> Result<(), StoreError> {
        match self.failure.read().map_err(poisoned)?.as_ref() {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(()),
        }
    }

    fn not_found(collection: &str, id: &str) -> StoreError {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

/// Evaluate `query` over one collection's documents
fn run_query(documents: &BTreeMap<String, Fields>, query: &Query) -> Vec<Snapshot> {
    let order_field = query.order_by.as_ref().map(|o| o.field.as_str());

    let mut hits: Vec<(&String, &Fields)> = documents
        .iter()
        .filter(|(_, fields)| query.predicates.iter().all(|p| p.matches(fields)))
        // Documents lacking the ordered field are excluded from ordered results
        .filter(|(_, fields)| order_field.map_or(true, |f| fields.contains_key(f)))
        .collect();

    let sort_value = |fields: &Fields| -> Option<FieldValue> {
        order_field.and_then(|f| fields.get(f).cloned())
    };

    hits.sort_by(|(a_id, a), (b_id, b)| {
        query.compare_positions(
            (sort_value(a).as_ref(), a_id.as_str()),
            (sort_value(b).as_ref(), b_id.as_str()),
        )
    });

    if let Some(cursor) = &query.start_after {
        hits.retain(|(id, fields)| {
            query.compare_positions(
                (sort_value(fields).as_ref(), id.as_str()),
                (cursor.sort_value.as_ref(), cursor.id.as_str()),
            ) == Ordering::Greater
        });
    }

    hits.into_iter()
        .skip(query.offset)
        .take(query.limit.unwrap_or(usize::MAX))
        .map(|(id, fields)| Snapshot::new(id.clone(), fields.clone()))
        .collect()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query(&self, query: &Query) -> Result<Vec<Snapshot>, StoreError> {
        self.issued.lock().map_err(poisoned)?.push(query.clone());
        self.check_failure()?;

        let collections = self.collections.read().map_err(poisoned)?;
        let results = collections
            .get(&query.collection)
            .map(|documents| run_query(documents, query))
            .unwrap_or_default();

        debug!(
            "Memory query on {} matched {} documents",
            query.collection,
            results.len()
        );
        Ok(results)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Snapshot>, StoreError> {
        self.check_failure()?;
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .map(|fields| Snapshot::new(id, fields.clone())))
    }

    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        self.check_failure()?;
        let id = format!("doc{:08}", self.next_id.fetch_add(1, AtomicOrdering::SeqCst) + 1);
        self.insert(collection, &id, fields)?;
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        self.check_failure()?;
        let mut collections = self.collections.write().map_err(poisoned)?;
        let document = collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id))
            .ok_or_else(|| Self::not_found(collection, id))?;
        document.extend(fields);
        Ok(())
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        by: i64,
    ) -> Result<(), StoreError> {
        self.check_failure()?;
        let mut collections = self.collections.write().map_err(poisoned)?;
        let document = collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id))
            .ok_or_else(|| Self::not_found(collection, id))?;

        // Non-numeric or missing fields restart from zero
        let next = match document.get(field) {
            Some(FieldValue::Integer(i)) => FieldValue::Integer(i + by),
            Some(FieldValue::Double(d)) => FieldValue::Double(d + by as f64),
            _ => FieldValue::Integer(by),
        };
        document.insert(field.to_string(), next);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check_failure()?;
        let mut collections = self.collections.write().map_err(poisoned)?;
        if let Some(documents) = collections.get_mut(collection) {
            documents.remove(id);
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
