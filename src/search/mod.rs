pub mod codec;
pub mod query;
pub mod service;

pub use codec::{decode_item, item_fields};
pub use query::{apply_distance_pass, build_search_query, sort_clause, ITEMS};
pub use service::ItemQueryService;
