// Shared test fixtures for upstream attendances and employee profiles.
// The canonical values live in json/ next to this file.

use crate::modules::attendance_sync::core::attendance::{EmployeeProfile, UpstreamRecord};

const ATTENDANCE_RECORD_JSON: &str = include_str!("json/attendance_record.json");
const EMPLOYEE_PROFILE_JSON: &str = include_str!("json/employee_profile.json");

pub struct UpstreamRecordBuilder {
    inner: UpstreamRecord,
}

impl UpstreamRecordBuilder {
    pub fn new() -> Self {
        let inner: UpstreamRecord =
            serde_json::from_str(ATTENDANCE_RECORD_JSON).expect("attendance fixture is valid json");
        Self { inner }
    }

    pub fn id(mut self, v: impl Into<String>) -> Self {
        self.inner.id = v.into();
        self
    }

    pub fn id_v2(mut self, v: Option<&str>) -> Self {
        self.inner.id_v2 = v.map(Into::into);
        self
    }

    pub fn employee_id(mut self, v: impl Into<String>) -> Self {
        self.inner.employee_id = v.into();
        self
    }

    pub fn date(mut self, v: impl Into<String>) -> Self {
        self.inner.date = v.into();
        self
    }

    pub fn start_time(mut self, v: Option<&str>) -> Self {
        self.inner.start_time = v.map(Into::into);
        self
    }

    pub fn end_time(mut self, v: Option<&str>) -> Self {
        self.inner.end_time = v.map(Into::into);
        self
    }

    pub fn build(self) -> UpstreamRecord {
        self.inner
    }
}

/// Ada Lovelace, employee 42.
pub fn make_employee_profile() -> EmployeeProfile {
    serde_json::from_str(EMPLOYEE_PROFILE_JSON).expect("employee fixture is valid json")
}
