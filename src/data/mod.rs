//! Data ingestion and storage
//!
//! JSON feed import and the SQLite-backed record store.

pub mod feed;
pub mod store;

pub use feed::{load_feed, parse_feed, FeedImport};
pub use store::{RecordStore, StoreStats};
