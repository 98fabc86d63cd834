//! Interface definitions for the search engine.
//!
//! These traits allow for dependency injection and swappable search backend
//! implementations.

mod index_group_provider;
mod index_lock;
mod search_engine_client;

pub use index_group_provider::IndexGroupProvider;
pub use index_lock::{IndexLock, LockToken};
pub use search_engine_client::SearchEngineClient;
