//! In-process [`QueryCatalog`] for tests and embedding.

use parking_lot::RwLock;
use querydesk_core::{QueryDefinition, QueryListing};

use super::{CatalogError, QueryCatalog};

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    definitions: RwLock<Vec<QueryDefinition>>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new(definitions: Vec<QueryDefinition>) -> Self {
        Self {
            definitions: RwLock::new(definitions),
        }
    }
}

impl QueryCatalog for MemoryCatalog {
    fn list(&self) -> Result<Vec<QueryListing>, CatalogError> {
        Ok(self
            .definitions
            .read()
            .iter()
            .map(QueryDefinition::listing)
            .collect())
    }

    fn get_by_id(&self, id: &str) -> Result<Option<QueryDefinition>, CatalogError> {
        Ok(self.definitions.read().iter().find(|d| d.id == id).cloned())
    }

    fn replace_sql(&self, id: &str, sql: &str) -> Result<(), CatalogError> {
        let mut definitions = self.definitions.write();
        let definition = definitions
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| CatalogError::NotFound { id: id.to_string() })?;
        definition.sql = sql.to_string();
        Ok(())
    }
}
