//! In-memory storage adapter for tests and local development

mod store;

pub use store::{MemoryStore, MemoryTx};
