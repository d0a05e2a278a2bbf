//! Persistent store of query definitions.
//!
//! [`QueryCatalog`] is the only way the service reads or changes a
//! [`QueryDefinition`]. The API is synchronous; async callers go through
//! `spawn_blocking`.

pub mod json_file;
pub mod memory;

use querydesk_core::{QueryDefinition, QueryListing};

pub use json_file::JsonFileCatalog;
pub use memory::MemoryCatalog;

/// Catalog failures.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("query {id} not found")]
    NotFound { id: String },
    #[error("catalog I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog is not a valid definition list: {0}")]
    Format(#[from] serde_json::Error),
}

/// Keyed store of [`QueryDefinition`] records.
///
/// Reads are unlocked and reflect the last completed write. Writes are
/// serialized per store instance.
///
/// Used as `Arc<dyn QueryCatalog>`.
pub trait QueryCatalog: Send + Sync {
    /// `{id, name}` of every definition, in stored order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the store cannot be read.
    fn list(&self) -> Result<Vec<QueryListing>, CatalogError>;

    /// The full definition for `id`, or `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the store cannot be read.
    fn get_by_id(&self, id: &str) -> Result<Option<QueryDefinition>, CatalogError>;

    /// Replaces the SQL template of `id`, leaving every other field intact.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] if no definition has that id, otherwise
    /// any read or write failure of the store.
    fn replace_sql(&self, id: &str, sql: &str) -> Result<(), CatalogError>;
}
