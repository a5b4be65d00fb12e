// In memory implementation of the BoardClient port.
//
// Purpose
// - Exercise the reconciler and batch runner without the monday.com API.
//
// Responsibilities
// - Keep created items in a map keyed by the item id it hands out.
// - Record every mutation call so tests can count creates and updates.
// - Fail on demand: offline, rejected references, or creates without an id.

use crate::modules::attendance_sync::core::ports::{BoardClient, BoardError};
use crate::modules::attendance_sync::core::projection::{FieldProjection, FieldValue};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

const FIRST_ITEM_ID: u64 = 9001;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardItem {
    pub board_id: String,
    pub name: String,
    pub fields: Vec<(String, FieldValue)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardCall {
    Create { board_id: String, name: String },
    Update { downstream_id: String },
}

#[derive(Default)]
pub struct InMemoryBoard {
    items: RwLock<BTreeMap<String, BoardItem>>,
    calls: Mutex<Vec<BoardCall>>,
    issued: AtomicU64,
    rejected: HashSet<String>,
    is_offline: bool,
    omit_identifier: bool,
}

impl InMemoryBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    pub fn toggle_omit_identifier(&mut self) {
        self.omit_identifier = !self.omit_identifier;
    }

    /// Rejects any mutation whose column values carry this text.
    pub fn reject_reference(&mut self, external_reference: impl Into<String>) {
        self.rejected.insert(external_reference.into());
    }

    pub async fn calls(&self) -> Vec<BoardCall> {
        self.calls.lock().await.clone()
    }

    pub async fn create_count(&self) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| matches!(c, BoardCall::Create { .. }))
            .count()
    }

    pub async fn update_count(&self) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| matches!(c, BoardCall::Update { .. }))
            .count()
    }

    pub async fn item(&self, downstream_id: &str) -> Option<BoardItem> {
        self.items.read().await.get(downstream_id).cloned()
    }

    pub async fn item_count(&self) -> usize {
        self.items.read().await.len()
    }

    fn check(&self, projection: &FieldProjection) -> Result<(), BoardError> {
        if self.is_offline {
            return Err(BoardError::Transport("Board offline".into()));
        }
        let rejected = projection.fields().iter().find_map(|(_, value)| match value {
            FieldValue::Text(text) if self.rejected.contains(text) => Some(text),
            _ => None,
        });
        match rejected {
            Some(text) => Err(BoardError::Rejected(format!("column value {text} rejected"))),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl BoardClient for InMemoryBoard {
    async fn create_record(
        &self,
        board_id: &str,
        display_name: &str,
        projection: &FieldProjection,
    ) -> Result<String, BoardError> {
        self.calls.lock().await.push(BoardCall::Create {
            board_id: board_id.to_string(),
            name: display_name.to_string(),
        });
        self.check(projection)?;
        if self.omit_identifier {
            return Err(BoardError::MissingIdentifier);
        }

        let id = (FIRST_ITEM_ID + self.issued.fetch_add(1, Ordering::SeqCst)).to_string();
        self.items.write().await.insert(
            id.clone(),
            BoardItem {
                board_id: board_id.to_string(),
                name: display_name.to_string(),
                fields: projection.fields().to_vec(),
            },
        );
        Ok(id)
    }

    async fn update_record(
        &self,
        downstream_id: &str,
        projection: &FieldProjection,
    ) -> Result<(), BoardError> {
        self.calls.lock().await.push(BoardCall::Update {
            downstream_id: downstream_id.to_string(),
        });
        self.check(projection)?;

        let mut items = self.items.write().await;
        let item = items
            .get_mut(downstream_id)
            .ok_or_else(|| BoardError::Rejected(format!("item {downstream_id} not found")))?;
        for (key, value) in projection.fields() {
            match item.fields.iter_mut().find(|(k, _)| k == key) {
                Some((_, existing)) => *existing = value.clone(),
                None => item.fields.push((key.clone(), value.clone())),
            }
        }
        Ok(())
    }
}
