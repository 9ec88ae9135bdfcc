// Adapters layer: concrete implementations for external systems.

pub mod local_storage;

pub use local_storage::LocalStorage;
