pub mod firestore;
pub mod memory;
pub mod traits;
pub mod types;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;
pub use traits::DocumentStore;
pub use types::{
    Cursor, Direction, FieldValue, Fields, NativeGeoPoint, Operator, OrderBy, Predicate, Query,
    Snapshot,
};
