//! Adapters for the ports.

pub mod inmem_store;

pub use self::inmem_store::{InMemoryStore, StoreSnapshot};
