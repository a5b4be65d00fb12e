use crate::modules::attendance_sync::core::fingerprint::Fingerprint;
use crate::modules::attendance_sync::core::identity::{IdentityMapping, IdentityTable};
use crate::modules::attendance_sync::core::ports::{BoardClient, BoardError};
use crate::modules::attendance_sync::core::projection::FieldProjection;
use crate::modules::attendance_sync::use_cases::reconcile_record::decide::decide_reconcile;
use crate::modules::attendance_sync::use_cases::reconcile_record::decision::{Decision, Outcome};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("create failed: {0}")]
    Create(#[source] BoardError),

    #[error("update of item {downstream_id} failed: {source}")]
    Update {
        downstream_id: String,
        #[source]
        source: BoardError,
    },
}

/// Applies one projection to the board, routed by the identity table.
///
/// The table lock is never held across a board call. The table is only
/// written after the board confirmed the mutation.
pub struct Reconciler<TBoard>
where
    TBoard: BoardClient + 'static,
{
    board_id: String,
    board: Arc<TBoard>,
}

impl<TBoard> Reconciler<TBoard>
where
    TBoard: BoardClient + 'static,
{
    pub fn new(board_id: impl Into<String>, board: Arc<TBoard>) -> Self {
        Self {
            board_id: board_id.into(),
            board,
        }
    }

    pub async fn reconcile(
        &self,
        external_reference: &str,
        projection: &FieldProjection,
        fingerprint: &Fingerprint,
        table: &Mutex<IdentityTable>,
    ) -> Result<Outcome, ReconcileError> {
        let decision = decide_reconcile(lock(table).get(external_reference), fingerprint);

        match decision {
            Decision::Create => {
                let downstream_id = self
                    .board
                    .create_record(&self.board_id, projection.display_name(), projection)
                    .await
                    .map_err(ReconcileError::Create)?;
                info!(external_reference, downstream_id = %downstream_id, "created board item");
                lock(table).insert(
                    external_reference,
                    IdentityMapping {
                        downstream_id,
                        fingerprint: fingerprint.clone(),
                    },
                );
                Ok(Outcome::Created)
            }
            Decision::Update { downstream_id } => {
                self.board
                    .update_record(&downstream_id, projection)
                    .await
                    .map_err(|source| ReconcileError::Update {
                        downstream_id: downstream_id.clone(),
                        source,
                    })?;
                info!(external_reference, downstream_id = %downstream_id, "updated board item");
                lock(table).update_fingerprint(external_reference, fingerprint.clone());
                Ok(Outcome::Updated)
            }
            Decision::Skip { downstream_id } => {
                debug!(external_reference, downstream_id = %downstream_id, "board item unchanged");
                Ok(Outcome::Unchanged)
            }
        }
    }
}

fn lock(table: &Mutex<IdentityTable>) -> MutexGuard<'_, IdentityTable> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}
