use serde::Serialize;
use thiserror::Error;

use crate::modules::attendance_sync::core::ports::{StoreError, UpstreamError};
use crate::modules::attendance_sync::use_cases::project_record::project::ProjectionError;
use crate::modules::attendance_sync::use_cases::reconcile_record::decision::Outcome;
use crate::modules::attendance_sync::use_cases::reconcile_record::handler::ReconcileError;

/// Why a single attendance did not reach the board in this run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub external_reference: String,
    pub error: RecordError,
}

/// A failure that prevented the whole run from starting.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("fetching attendances failed: {0}")]
    Fetch(#[from] UpstreamError),

    #[error("loading the identity store failed: {0}")]
    LoadStore(#[from] StoreError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: Vec<RecordFailure>,
}

impl BatchReport {
    pub fn record(&mut self, external_reference: &str, result: Result<Outcome, RecordError>) {
        self.processed += 1;
        match result {
            Ok(Outcome::Created) => self.created += 1,
            Ok(Outcome::Updated) => self.updated += 1,
            Ok(Outcome::Unchanged) => self.unchanged += 1,
            Err(error) => self.failed.push(RecordFailure {
                external_reference: external_reference.to_string(),
                error,
            }),
        }
    }

    /// True when the identity table changed during the run.
    pub fn has_mutations(&self) -> bool {
        self.created + self.updated > 0
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            processed: self.processed,
            created: self.created,
            updated: self.updated,
            unchanged: self.unchanged,
            failed: self.failed.len(),
        }
    }
}

/// Counts only, for logs and the status endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}
