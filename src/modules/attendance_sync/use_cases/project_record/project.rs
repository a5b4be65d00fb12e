use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;
use tracing::warn;

use crate::modules::attendance_sync::core::attendance::{
    EmployeeProfile, FALLBACK_DISPLAY_NAME, UpstreamRecord,
};
use crate::modules::attendance_sync::core::board_columns::BoardColumns;
use crate::modules::attendance_sync::core::projection::{FieldProjection, FieldValue, Hours};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("attendance {external_reference} has an invalid date {value:?}")]
    InvalidDate {
        external_reference: String,
        value: String,
    },
}

/// Maps one attendance onto the board's column values.
///
/// `employee` is `None` when the employee is unknown or could not be
/// fetched; the item then gets the fallback name. Unparseable times are treated as absent. An end time
/// earlier than the start time is read as falling on the next day.
pub fn project(
    record: &UpstreamRecord,
    employee: Option<&EmployeeProfile>,
    columns: &BoardColumns,
) -> Result<FieldProjection, ProjectionError> {
    let external_reference = record.external_reference();
    let date = NaiveDate::parse_from_str(record.date.trim(), "%Y-%m-%d").map_err(|_| {
        ProjectionError::InvalidDate {
            external_reference: external_reference.to_string(),
            value: record.date.clone(),
        }
    })?;
    let start = parse_time(record.start_time.as_deref(), "start_time", external_reference);
    let end = parse_time(record.end_time.as_deref(), "end_time", external_reference);

    let display_name = employee
        .and_then(EmployeeProfile::display_name)
        .unwrap_or_else(|| FALLBACK_DISPLAY_NAME.to_string());

    let start_value = match start {
        Some(time) => FieldValue::DateTime { date, time },
        None => FieldValue::Date { date },
    };

    let mut projection = FieldProjection::new(display_name)
        .with_field(&columns.start, start_value)
        .with_field(&columns.duration, FieldValue::Numeric(elapsed(date, start, end)))
        .with_field(
            &columns.external_reference,
            FieldValue::Text(external_reference.to_string()),
        );

    if let Some(column) = &columns.employee {
        projection.set(column, FieldValue::Text(record.employee_id.clone()));
    }
    if let (Some(column), Some(email)) = (
        &columns.email,
        employee.and_then(|e| e.email.as_deref()).filter(|e| !e.is_empty()),
    ) {
        projection.set(column, FieldValue::Text(email.to_string()));
    }
    // In-progress attendances carry no end column at all.
    if let Some(time) = end {
        projection.set(
            &columns.end,
            FieldValue::DateTime {
                date: end_date(date, start, time),
                time,
            },
        );
    }

    Ok(projection)
}

fn parse_time(raw: Option<&str>, field: &str, external_reference: &str) -> Option<NaiveTime> {
    let raw = raw.map(str::trim).filter(|v| !v.is_empty())?;
    let parsed = NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok();
    if parsed.is_none() {
        warn!(
            external_reference,
            field,
            value = raw,
            "ignoring malformed attendance time"
        );
    }
    parsed
}

fn end_date(date: NaiveDate, start: Option<NaiveTime>, end: NaiveTime) -> NaiveDate {
    match start {
        Some(start) if end < start => date.succ_opt().unwrap_or(date),
        _ => date,
    }
}

fn elapsed(date: NaiveDate, start: Option<NaiveTime>, end: Option<NaiveTime>) -> Hours {
    let (Some(start), Some(end)) = (start, end) else {
        return Hours::ZERO;
    };
    let started_at = date.and_time(start);
    let ended_at = end_date(date, Some(start), end).and_time(end);
    Hours::from_elapsed(ended_at - started_at)
}
