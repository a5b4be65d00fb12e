// In memory implementation of the IdentityStore port.
//
// Purpose
// - Let the batch runner persist its table without touching the filesystem.
//
// Responsibilities
// - Hold the last saved table and count saves.
// - Fail loads and saves independently so tests can cover both paths.

use crate::modules::attendance_sync::core::identity::IdentityTable;
use crate::modules::attendance_sync::core::ports::{IdentityStore, StoreError};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryIdentityStore {
    saved: RwLock<Option<IdentityTable>>,
    saves: AtomicUsize,
    load_offline: bool,
    save_offline: bool,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: IdentityTable) -> Self {
        Self {
            saved: RwLock::new(Some(table)),
            ..Self::default()
        }
    }

    pub fn toggle_load_offline(&mut self) {
        self.load_offline = !self.load_offline;
    }

    pub fn toggle_save_offline(&mut self) {
        self.save_offline = !self.save_offline;
    }

    pub async fn saved(&self) -> Option<IdentityTable> {
        self.saved.read().await.clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn load(&self) -> Result<IdentityTable, StoreError> {
        if self.load_offline {
            return Err(StoreError::Backend("Identity store offline".into()));
        }
        Ok(self.saved.read().await.clone().unwrap_or_default())
    }

    async fn save(&self, table: &IdentityTable) -> Result<(), StoreError> {
        if self.save_offline {
            return Err(StoreError::Backend("Identity store offline".into()));
        }
        *self.saved.write().await = Some(table.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
