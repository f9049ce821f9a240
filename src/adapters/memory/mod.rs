//! In-process adapters, used by tests and `storage.backend: memory`.

pub mod run_repository;
pub mod version_store;

pub use run_repository::InMemoryRunRepository;
pub use version_store::InMemoryVersionStore;
