use crate::error::StoreError;
use crate::models::GeoPoint;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Field map of a stored document
pub type Fields = BTreeMap<String, FieldValue>;

/// The store's native geo point. Only construction from and decomposition
/// into a latitude/longitude pair are supported.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NativeGeoPoint {
    latitude: f64,
    longitude: f64,
}

impl NativeGeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl From<GeoPoint> for NativeGeoPoint {
    fn from(point: GeoPoint) -> Self {
        Self::new(point.latitude, point.longitude)
    }
}

impl From<NativeGeoPoint> for GeoPoint {
    fn from(point: NativeGeoPoint) -> Self {
        GeoPoint::new(point.latitude(), point.longitude())
    }
}

/// A typed value held in a document field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    Timestamp(DateTime<Utc>),
    String(String),
    GeoPoint(NativeGeoPoint),
    Array(Vec<FieldValue>),
    Map(Fields),
}

impl FieldValue {
    /// Cross-type ordering rank. Integers and doubles share a rank and compare numerically.
    fn type_rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Integer(_) | FieldValue::Double(_) => 2,
            FieldValue::Timestamp(_) => 3,
            FieldValue::String(_) => 4,
            FieldValue::GeoPoint(_) => 5,
            FieldValue::Array(_) => 6,
            FieldValue::Map(_) => 7,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Whether two values may be compared by a range predicate
    pub fn same_kind(&self, other: &FieldValue) -> bool {
        self.type_rank() == other.type_rank()
    }

    /// Total order over all values, the way the store sorts mixed-type fields
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        let rank = self.type_rank().cmp(&other.type_rank());
        if rank != Ordering::Equal {
            return rank;
        }

        match (self, other) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a.cmp(b),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a.cmp(b),
            (FieldValue::String(a), FieldValue::String(b)) => a.cmp(b),
            (FieldValue::GeoPoint(a), FieldValue::GeoPoint(b)) => a
                .latitude()
                .total_cmp(&b.latitude())
                .then(a.longitude().total_cmp(&b.longitude())),
            (FieldValue::Array(a), FieldValue::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.compare(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (FieldValue::Map(a), FieldValue::Map(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                    let ord = ka.cmp(kb).then_with(|| va.compare(vb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => Ordering::Equal,
            },
        }
    }

    /// Plain JSON rendering used when reshaping documents into view models.
    /// Geo points become `{latitude, longitude}` and timestamps RFC 3339 strings.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Integer(i) => Value::Number((*i).into()),
            FieldValue::Double(d) => Number::from_f64(*d).map(Value::Number).unwrap_or(Value::Null),
            FieldValue::Timestamp(ts) => Value::String(ts.to_rfc3339()),
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::GeoPoint(p) => serde_json::json!({
                "latitude": p.latitude(),
                "longitude": p.longitude(),
            }),
            FieldValue::Array(values) => Value::Array(values.iter().map(FieldValue::to_json).collect()),
            FieldValue::Map(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }

    /// Inverse of [`FieldValue::to_json`] for plain JSON. Strings stay strings;
    /// callers re-type timestamp and geo fields themselves.
    pub fn from_json(value: &Value) -> FieldValue {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => FieldValue::String(s.clone()),
            Value::Array(values) => FieldValue::Array(values.iter().map(FieldValue::from_json).collect()),
            Value::Object(map) => FieldValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl From<GeoPoint> for FieldValue {
    fn from(value: GeoPoint) -> Self {
        FieldValue::GeoPoint(value.into())
    }
}

/// Comparison operator of a predicate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Operator {
    Equal,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

/// A single field-comparison constraint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub op: Operator,
    pub value: FieldValue,
}

impl Predicate {
    pub fn eq(field: &str, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.to_string(),
            op: Operator::Equal,
            value: value.into(),
        }
    }

    pub fn gte(field: &str, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.to_string(),
            op: Operator::GreaterThanOrEqual,
            value: value.into(),
        }
    }

    pub fn lte(field: &str, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.to_string(),
            op: Operator::LessThanOrEqual,
            value: value.into(),
        }
    }

    /// Missing fields and values of a different kind never match
    pub fn matches(&self, fields: &Fields) -> bool {
        let Some(actual) = fields.get(&self.field) else {
            return false;
        };
        if !actual.same_kind(&self.value) {
            return false;
        }

        let ord = actual.compare(&self.value);
        match self.op {
            Operator::Equal => ord == Ordering::Equal,
            Operator::GreaterThanOrEqual => ord != Ordering::Less,
            Operator::LessThanOrEqual => ord != Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A single field + direction ordering clause
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Resume point for cursor pagination: the last seen sort value and document id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cursor {
    pub sort_value: Option<FieldValue>,
    pub id: String,
}

/// A query against one collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    pub collection: String,
    pub predicates: Vec<Predicate>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
    pub offset: usize,
    pub start_after: Option<Cursor>,
}

impl Query {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            predicates: Vec::new(),
            order_by: None,
            limit: None,
            offset: 0,
            start_after: None,
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn start_after(mut self, cursor: Cursor) -> Self {
        self.start_after = Some(cursor);
        self
    }

    /// Cursor pointing just past `snapshot` under this query's ordering
    pub fn cursor_for(&self, snapshot: &Snapshot) -> Cursor {
        Cursor {
            sort_value: self
                .order_by
                .as_ref()
                .and_then(|order| snapshot.fields.get(&order.field).cloned()),
            id: snapshot.id.clone(),
        }
    }

    /// Compare two `(sort value, id)` positions in result order.
    /// Ties on the sort value fall back to the id, in the same direction.
    pub fn compare_positions(
        &self,
        a: (Option<&FieldValue>, &str),
        b: (Option<&FieldValue>, &str),
    ) -> Ordering {
        let by_value = match (a.0, b.0) {
            (Some(x), Some(y)) => x.compare(y),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        let ord = by_value.then_with(|| a.1.cmp(b.1));

        match self.order_by.as_ref().map(|o| o.direction) {
            Some(Direction::Descending) => ord.reverse(),
            _ => ord,
        }
    }
}

/// An opaque per-document query result
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub id: String,
    pub fields: Fields,
}

impl Snapshot {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Reshape the document into a view model. The document id is exposed as `id`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut object: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        object.insert("id".to_string(), Value::String(self.id.clone()));

        serde_json::from_value(Value::Object(object)).map_err(|e| StoreError::Malformed {
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }
}
