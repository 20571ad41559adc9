// Adapters layer: concrete implementations for external systems (file storage, content stores).

pub mod local_storage;
pub mod memory_store;
pub mod rest_store;

pub use local_storage::LocalStorage;
pub use memory_store::MemoryStore;
pub use rest_store::RestStore;
