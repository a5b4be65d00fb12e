// In memory implementation of the AttendanceSource port.
//
// Purpose
// - Feed the batch runner fixed attendances and employees in tests and local development.
//
// Responsibilities
// - Return the stored attendances whose date falls inside the requested window.
// - Count employee lookups so tests can assert per-run caching.

use crate::modules::attendance_sync::core::attendance::{EmployeeProfile, UpstreamRecord};
use crate::modules::attendance_sync::core::ports::{AttendanceSource, UpstreamError};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryAttendanceSource {
    records: RwLock<Vec<UpstreamRecord>>,
    employees: RwLock<HashMap<String, EmployeeProfile>>,
    employee_lookups: AtomicUsize,
    is_offline: bool,
    are_employees_offline: AtomicBool,
}

impl InMemoryAttendanceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    /// Fails employee lookups only; callable while the source is shared.
    pub fn toggle_employees_offline(&self) {
        self.are_employees_offline.fetch_xor(true, Ordering::SeqCst);
    }

    pub async fn set_records(&self, records: Vec<UpstreamRecord>) {
        *self.records.write().await = records;
    }

    pub async fn add_employee(&self, employee: EmployeeProfile) {
        self.employees
            .write()
            .await
            .insert(employee.id.clone(), employee);
    }

    pub fn employee_lookups(&self) -> usize {
        self.employee_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AttendanceSource for InMemoryAttendanceSource {
    async fn fetch_attendance(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<UpstreamRecord>, UpstreamError> {
        if self.is_offline {
            return Err(UpstreamError::Transport("Attendance source offline".into()));
        }

        // Records with an unparseable date are passed through so the
        // projector can report them.
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| match NaiveDate::parse_from_str(&r.date, "%Y-%m-%d") {
                Ok(date) => start <= date && date <= end,
                Err(_) => true,
            })
            .cloned()
            .collect())
    }

    async fn fetch_employee(&self, employee_id: &str) -> Result<EmployeeProfile, UpstreamError> {
        self.employee_lookups.fetch_add(1, Ordering::SeqCst);
        // Let other partitions run while the lookup is in flight.
        tokio::task::yield_now().await;
        if self.is_offline || self.are_employees_offline.load(Ordering::SeqCst) {
            return Err(UpstreamError::Transport("Employee lookup offline".into()));
        }

        self.employees
            .read()
            .await
            .get(employee_id)
            .cloned()
            .ok_or_else(|| UpstreamError::EmployeeNotFound(employee_id.to_string()))
    }
}
