//! Conversions between item view models and stored item documents.
//!
//! Documents use camelCase field names, keep `location` as the store's native
//! geo point and timestamps as native timestamps. Absent optional values are
//! left out of the document rather than written as nulls.

use crate::error::StoreError;
use crate::models::{Item, ItemUpdate, NewItem, PROVINCE};
use crate::store::{FieldValue, Fields, Snapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Plain fields of a serializable value, nulls dropped
fn plain_fields<T: Serialize>(value: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
            .collect()),
        other => Err(StoreError::Backend(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Document fields for an existing item, e.g. when seeding a store
pub fn item_fields(item: &Item) -> Result<Fields, StoreError> {
    let mut fields = plain_fields(item)?;
    fields.remove("id");
    fields.remove("distanceKm");
    fields.insert("location".to_string(), item.location.into());
    fields.insert("createdAt".to_string(), item.created_at.into());
    if let Some(updated_at) = item.updated_at {
        fields.insert("updatedAt".to_string(), updated_at.into());
    }
    Ok(fields)
}

/// Document fields for a freshly listed item
pub fn new_item_fields(
    new_item: &NewItem,
    lessor_id: &str,
    now: DateTime<Utc>,
) -> Result<Fields, StoreError> {
    let mut fields = plain_fields(new_item)?;
    fields.insert("location".to_string(), new_item.location.into());
    fields.insert("province".to_string(), PROVINCE.into());
    fields.insert("lessorId".to_string(), lessor_id.into());
    fields.insert("isAvailable".to_string(), true.into());
    fields.insert("isVerified".to_string(), false.into());
    fields.insert("createdAt".to_string(), now.into());
    fields.insert("updatedAt".to_string(), now.into());
    fields.insert("rating".to_string(), FieldValue::Double(0.0));
    fields.insert("totalReviews".to_string(), FieldValue::Integer(0));
    fields.insert("viewCount".to_string(), FieldValue::Integer(0));
    Ok(fields)
}

/// Fields written by a partial update: only the supplied ones, plus `updatedAt`
pub fn update_fields(update: &ItemUpdate, now: DateTime<Utc>) -> Result<Fields, StoreError> {
    let mut fields = plain_fields(update)?;
    if let Some(location) = update.location {
        fields.insert("location".to_string(), location.into());
    }
    fields.insert("updatedAt".to_string(), now.into());
    Ok(fields)
}

/// Reshape a stored document into the item view model
pub fn decode_item(snapshot: &Snapshot) -> Result<Item, StoreError> {
    snapshot.decode::<Item>()
}
