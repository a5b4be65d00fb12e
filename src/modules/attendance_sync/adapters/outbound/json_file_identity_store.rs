// JSON file implementation of the IdentityStore port.
//
// Responsibilities
// - Read the table from a single versioned JSON document.
// - Write through a temporary file and rename so a crash never leaves a half-written table.
// - Treat a missing file as an empty table. Move unreadable content aside and start empty.

use crate::modules::attendance_sync::core::identity::IdentityTable;
use crate::modules::attendance_sync::core::ports::{IdentityStore, StoreError};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct StoredTable {
    version: u32,
    mappings: IdentityTable,
}

pub struct JsonFileIdentityStore {
    path: PathBuf,
}

impl JsonFileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }

    async fn quarantine(&self, reason: &str) {
        let target = self.sibling(".corrupt");
        match tokio::fs::rename(&self.path, &target).await {
            Ok(()) => warn!(
                path = %self.path.display(),
                moved_to = %target.display(),
                reason,
                "identity store unreadable; starting with an empty table"
            ),
            Err(error) => warn!(
                path = %self.path.display(),
                reason,
                %error,
                "identity store unreadable and could not be moved aside; starting with an empty table"
            ),
        }
    }
}

#[async_trait::async_trait]
impl IdentityStore for JsonFileIdentityStore {
    async fn load(&self) -> Result<IdentityTable, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no identity store yet; starting empty");
                return Ok(IdentityTable::new());
            }
            Err(error) => return Err(StoreError::Io(error)),
        };

        match serde_json::from_slice::<StoredTable>(&bytes) {
            Ok(stored) if stored.version == FORMAT_VERSION => Ok(stored.mappings),
            Ok(stored) => {
                self.quarantine(&format!("unsupported format version {}", stored.version))
                    .await;
                Ok(IdentityTable::new())
            }
            Err(error) => {
                self.quarantine(&error.to_string()).await;
                Ok(IdentityTable::new())
            }
        }
    }

    async fn save(&self, table: &IdentityTable) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(&StoredTable {
            version: FORMAT_VERSION,
            mappings: table.clone(),
        })
        .map_err(|e| StoreError::Encode(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.sibling(".tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
