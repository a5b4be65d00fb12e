// Ports define what the sync core needs from the outside world, without implementing it.
//
// Purpose
// - AttendanceSource: read attendances and employees from Personio.
// - BoardClient: create and update items on the monday.com board.
// - IdentityStore: load and save the attendance -> board item table.
//
// Boundaries
// - No concrete input or output here. Adapters implement these traits in the adapters layer.
// - Every adapter maps its transport failures onto the typed errors below.
//
// Testing guidance
// - In memory implementations live next to the real adapters.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::modules::attendance_sync::core::attendance::{EmployeeProfile, UpstreamRecord};
use crate::modules::attendance_sync::core::identity::IdentityTable;
use crate::modules::attendance_sync::core::projection::FieldProjection;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("employee {0} not found")]
    EmployeeNotFound(String),
}

#[async_trait]
pub trait AttendanceSource: Send + Sync {
    async fn fetch_attendance(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<UpstreamRecord>, UpstreamError>;

    async fn fetch_employee(&self, employee_id: &str) -> Result<EmployeeProfile, UpstreamError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("mutation rejected: {0}")]
    Rejected(String),

    #[error("create returned no item id")]
    MissingIdentifier,
}

#[async_trait]
pub trait BoardClient: Send + Sync {
    /// Creates an item and returns its board id.
    async fn create_record(
        &self,
        board_id: &str,
        display_name: &str,
        projection: &FieldProjection,
    ) -> Result<String, BoardError>;

    async fn update_record(
        &self,
        downstream_id: &str,
        projection: &FieldProjection,
    ) -> Result<(), BoardError>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("identity store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("identity store encode error: {0}")]
    Encode(String),

    #[error("backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Absent or unreadable content yields an empty table.
    async fn load(&self) -> Result<IdentityTable, StoreError>;

    async fn save(&self, table: &IdentityTable) -> Result<(), StoreError>;
}
