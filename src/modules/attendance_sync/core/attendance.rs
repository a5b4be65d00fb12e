use serde::{Deserialize, Serialize};

/// Item name used when the owning employee cannot be resolved to a full name.
pub const FALLBACK_DISPLAY_NAME: &str = "Personio Attendance";

/// One attendance event as fetched from Personio for a date window.
///
/// Times are kept as the raw `HH:MM` strings the source returns; parsing and
/// fallback handling happen in the projector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamRecord {
    pub id: String,
    pub id_v2: Option<String>,
    pub employee_id: String,
    pub date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl UpstreamRecord {
    /// Stable join key between Personio and the board. The versioned
    /// identifier wins over the legacy one when both are present.
    pub fn external_reference(&self) -> &str {
        self.id_v2
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmployeeProfile {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl EmployeeProfile {
    /// "first last" when both parts are known.
    pub fn display_name(&self) -> Option<String> {
        let first = self.first_name.as_deref().map(str::trim).unwrap_or_default();
        let last = self.last_name.as_deref().map(str::trim).unwrap_or_default();
        if first.is_empty() || last.is_empty() {
            return None;
        }
        Some(format!("{first} {last}"))
    }
}
