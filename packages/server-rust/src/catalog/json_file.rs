//! JSON-array catalog file.
//!
//! The file holds `[QueryDefinition, ...]`. Every read parses the file
//! afresh so edits made by other processes are picked up without a restart.
//! Writes go to a sibling temp file which is then renamed over the original,
//! so a concurrent reader sees either the old or the new array.

use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use querydesk_core::{QueryDefinition, QueryListing};

use super::{CatalogError, QueryCatalog};

pub struct JsonFileCatalog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileCatalog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty catalog.
    fn load(&self) -> Result<Vec<QueryDefinition>, CatalogError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, definitions: &[QueryDefinition]) -> Result<(), CatalogError> {
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let mut file = fs::File::create(&tmp)?;
        serde_json::to_writer_pretty(&mut file, definitions)?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl QueryCatalog for JsonFileCatalog {
    fn list(&self) -> Result<Vec<QueryListing>, CatalogError> {
        Ok(self.load()?.iter().map(QueryDefinition::listing).collect())
    }

    fn get_by_id(&self, id: &str) -> Result<Option<QueryDefinition>, CatalogError> {
        Ok(self.load()?.into_iter().find(|d| d.id == id))
    }

    fn replace_sql(&self, id: &str, sql: &str) -> Result<(), CatalogError> {
        let _guard = self.write_lock.lock();

        let mut definitions = self.load()?;
        let definition = definitions
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| CatalogError::NotFound { id: id.to_string() })?;
        definition.sql = sql.to_string();

        self.store(&definitions)?;
        tracing::info!(query_id = %id, path = %self.path.display(), "query SQL replaced");
        Ok(())
    }
}
