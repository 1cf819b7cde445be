use crate::config::FirestoreConfig;
use crate::error::StoreError;
use crate::store::traits::DocumentStore;
use crate::store::types::{
    Direction, FieldValue, Fields, NativeGeoPoint, Operator, Predicate, Query, Snapshot,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Document store backed by the Firestore REST API
pub struct FirestoreStore {
    client: Client,
    base_url: String,
    project_id: String,
    api_key: Option<String>,
    bearer_token: Option<String>,
}

impl FirestoreStore {
    /// Create a new Firestore client for the configured project
    pub fn new(config: &FirestoreConfig, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rental-scout/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    /// Resource name of the documents root, e.g. `projects/p/databases/(default)/documents`
    fn documents_name(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.documents_name(), collection, id)
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/{}{}", self.base_url, self.documents_name(), suffix)
    }

    /// URL of a collection, or of one document in it. Ids are pushed as a
    /// single path segment, so `/` and `?` are percent-encoded.
    fn document_url(&self, collection: &str, id: Option<&str>) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.url("")).map_err(|e| StoreError::Backend(e.to_string()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::Backend(format!("{} cannot be a base URL", self.base_url)))?;
            segments.push(collection);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(key) = &self.api_key {
            builder = builder.query(&[("key", key.as_str())]);
        }
        builder
    }

    /// Turn a non-success response into a `StoreError` carrying the backend's message
    async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(body);

        warn!("Firestore returned status: {}", status);
        Err(StoreError::Status {
            status: status.as_u16(),
            message,
        })
    }

    fn not_found(collection: &str, id: &str) -> StoreError {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

/// Encode a value in Firestore's typed JSON representation
pub fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => json!({ "nullValue": null }),
        FieldValue::Bool(b) => json!({ "booleanValue": b }),
        // 64-bit integers travel as strings
        FieldValue::Integer(i) => json!({ "integerValue": i.to_string() }),
        FieldValue::Double(d) => json!({ "doubleValue": d }),
        FieldValue::Timestamp(ts) => json!({ "timestampValue": ts.to_rfc3339() }),
        FieldValue::String(s) => json!({ "stringValue": s }),
        FieldValue::GeoPoint(p) => json!({
            "geoPointValue": { "latitude": p.latitude(), "longitude": p.longitude() }
        }),
        FieldValue::Array(values) => json!({
            "arrayValue": { "values": values.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        FieldValue::Map(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

pub fn encode_fields(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect::<Map<String, Value>>(),
    )
}

/// Decode Firestore's typed JSON representation
pub fn decode_value(value: &Value) -> Result<FieldValue, String> {
    let object = value
        .as_object()
        .ok_or_else(|| format!("expected typed value object, got {value}"))?;
    let (kind, inner) = object
        .iter()
        .next()
        .ok_or_else(|| "empty typed value".to_string())?;

    match kind.as_str() {
        "nullValue" => Ok(FieldValue::Null),
        "booleanValue" => inner
            .as_bool()
            .map(FieldValue::Bool)
            .ok_or_else(|| format!("bad booleanValue: {inner}")),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            };
            parsed
                .map(FieldValue::Integer)
                .ok_or_else(|| format!("bad integerValue: {inner}"))
        }
        "doubleValue" => match inner {
            // Non-finite doubles are sent as strings
            Value::String(s) => match s.as_str() {
                "NaN" => Ok(FieldValue::Double(f64::NAN)),
                "Infinity" => Ok(FieldValue::Double(f64::INFINITY)),
                "-Infinity" => Ok(FieldValue::Double(f64::NEG_INFINITY)),
                _ => Err(format!("bad doubleValue: {s}")),
            },
            other => other
                .as_f64()
                .map(FieldValue::Double)
                .ok_or_else(|| format!("bad doubleValue: {other}")),
        },
        "timestampValue" => inner
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|ts| FieldValue::Timestamp(ts.with_timezone(&Utc)))
            .ok_or_else(|| format!("bad timestampValue: {inner}")),
        "stringValue" | "referenceValue" => inner
            .as_str()
            .map(|s| FieldValue::String(s.to_string()))
            .ok_or_else(|| format!("bad {kind}: {inner}")),
        "geoPointValue" => {
            // Zero coordinates are omitted on the wire
            let latitude = inner["latitude"].as_f64().unwrap_or(0.0);
            let longitude = inner["longitude"].as_f64().unwrap_or(0.0);
            Ok(FieldValue::GeoPoint(NativeGeoPoint::new(latitude, longitude)))
        }
        "arrayValue" => {
            let values: Vec<FieldValue> = match inner["values"].as_array() {
                Some(values) => values.iter().map(decode_value).collect::<Result<_, _>>()?,
                None => Vec::new(),
            };
            Ok(FieldValue::Array(values))
        }
        "mapValue" => Ok(FieldValue::Map(decode_fields(&inner["fields"])?)),
        other => Err(format!("unsupported value type: {other}")),
    }
}

pub fn decode_fields(value: &Value) -> Result<Fields, String> {
    match value.as_object() {
        Some(object) => object
            .iter()
            .map(|(k, v)| decode_value(v).map(|decoded| (k.clone(), decoded)))
            .collect(),
        None => Ok(Fields::new()),
    }
}

fn decode_document(document: &Value) -> Result<Snapshot, StoreError> {
    let id = document["name"]
        .as_str()
        .and_then(|name| name.rsplit('/').next())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| StoreError::Malformed {
            id: String::new(),
            reason: "document has no name".to_string(),
        })?
        .to_string();
    let fields = decode_fields(&document["fields"]).map_err(|reason| StoreError::Malformed {
        id: id.clone(),
        reason,
    })?;
    Ok(Snapshot::new(id, fields))
}

fn encode_predicate(predicate: &Predicate) -> Value {
    let op = match predicate.op {
        Operator::Equal => "EQUAL",
        Operator::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
        Operator::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
    };
    json!({
        "fieldFilter": {
            "field": { "fieldPath": predicate.field },
            "op": op,
            "value": encode_value(&predicate.value),
        }
    })
}

fn encode_direction(direction: Direction) -> &'static str {
    match direction {
        Direction::Ascending => "ASCENDING",
        Direction::Descending => "DESCENDING",
    }
}

impl FirestoreStore {
    /// Build the `structuredQuery` body for `:runQuery`
    pub fn encode_query(&self, query: &Query) -> Value {
        let mut structured = Map::new();
        structured.insert("from".into(), json!([{ "collectionId": query.collection }]));

        match query.predicates.as_slice() {
            [] => {}
            [single] => {
                structured.insert("where".into(), encode_predicate(single));
            }
            many => {
                structured.insert(
                    "where".into(),
                    json!({
                        "compositeFilter": {
                            "op": "AND",
                            "filters": many.iter().map(encode_predicate).collect::<Vec<_>>(),
                        }
                    }),
                );
            }
        }

        let mut order_by = Vec::new();
        if let Some(order) = &query.order_by {
            order_by.push(json!({
                "field": { "fieldPath": order.field },
                "direction": encode_direction(order.direction),
            }));
        }

        if let Some(cursor) = &query.start_after {
            // Resuming needs the document name as an explicit tie-breaker
            let direction = query
                .order_by
                .as_ref()
                .map_or(Direction::Ascending, |o| o.direction);
            order_by.push(json!({
                "field": { "fieldPath": "__name__" },
                "direction": encode_direction(direction),
            }));

            let mut values = Vec::new();
            if query.order_by.is_some() {
                values.push(encode_value(cursor.sort_value.as_ref().unwrap_or(&FieldValue::Null)));
            }
            values.push(json!({
                "referenceValue": self.document_name(&query.collection, &cursor.id)
            }));
            structured.insert("startAt".into(), json!({ "values": values, "before": false }));
        }

        if !order_by.is_empty() {
            structured.insert("orderBy".into(), Value::Array(order_by));
        }
        if query.offset > 0 {
            structured.insert("offset".into(), json!(query.offset));
        }
        if let Some(limit) = query.limit {
            structured.insert("limit".into(), json!(limit));
        }

        json!({ "structuredQuery": structured })
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn query(&self, query: &Query) -> Result<Vec<Snapshot>, StoreError> {
        let body = self.encode_query(query);
        debug!("Running Firestore query: {}", body);

        let response = self
            .request(Method::POST, &self.url(":runQuery"))
            .json(&body)
            .send()
            .await?;
        let rows: Vec<Value> = Self::check(response).await?.json().await?;

        // Rows without a document only carry read metadata
        rows.iter()
            .filter(|row| row.get("document").is_some())
            .map(|row| decode_document(&row["document"]))
            .collect()
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Snapshot>, StoreError> {
        let url = self.document_url(collection, Some(id))?;
        let response = self.request(Method::GET, url.as_str()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let document: Value = Self::check(response).await?.json().await?;
        decode_document(&document).map(Some)
    }

    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let url = self.document_url(collection, None)?;
        let response = self
            .request(Method::POST, url.as_str())
            .json(&json!({ "fields": encode_fields(&fields) }))
            .send()
            .await?;

        let document: Value = Self::check(response).await?.json().await?;
        Ok(decode_document(&document)?.id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let url = self.document_url(collection, Some(id))?;
        let mut params: Vec<(&str, &str)> = fields
            .keys()
            .map(|k| ("updateMask.fieldPaths", k.as_str()))
            .collect();
        params.push(("currentDocument.exists", "true"));

        let response = self
            .request(Method::PATCH, url.as_str())
            .query(&params)
            .json(&json!({ "fields": encode_fields(&fields) }))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Self::not_found(collection, id));
        }

        Self::check(response).await?;
        Ok(())
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        by: i64,
    ) -> Result<(), StoreError> {
        let body = json!({
            "writes": [{
                "transform": {
                    "document": self.document_name(collection, id),
                    "fieldTransforms": [{
                        "fieldPath": field,
                        "increment": { "integerValue": by.to_string() },
                    }],
                },
                "currentDocument": { "exists": true },
            }]
        });

        let response = self
            .request(Method::POST, &self.url(":commit"))
            .json(&body)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Self::not_found(collection, id));
        }

        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let url = self.document_url(collection, Some(id))?;
        let response = self.request(Method::DELETE, url.as_str()).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "firestore"
    }
}

#[cfg(test)]
#[path = "firestore_test.rs"]
mod tests;
