pub mod config;
pub mod error;
pub mod geo;
pub mod models;
pub mod search;
pub mod session;
pub mod store;

pub use error::{ConfigError, ItemError, StoreError};
pub use search::ItemQueryService;
