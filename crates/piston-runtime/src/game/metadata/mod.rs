pub mod cache;
pub mod fetcher;
pub mod types;

pub use cache::MetadataCache;
pub use fetcher::{CatalogSource, HttpCatalogSource};
pub use types::*;
