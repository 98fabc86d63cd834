//! Lock implementations that do not need a search engine.

mod local;

pub use local::LocalLockRegistry;
