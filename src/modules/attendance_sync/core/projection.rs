use chrono::{NaiveDate, NaiveTime, TimeDelta};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// Elapsed time in hours, held as whole hundredths so rendering is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Hours {
    hundredths: i64,
}

impl Hours {
    pub const ZERO: Hours = Hours { hundredths: 0 };

    /// Rounds half up to two decimals. Negative spans clamp to zero.
    pub fn from_elapsed(elapsed: TimeDelta) -> Self {
        let seconds = elapsed.num_seconds().max(0);
        Self {
            hundredths: (seconds * 100 + 1_800) / 3_600,
        }
    }

    pub fn hundredths(self) -> i64 {
        self.hundredths
    }
}

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.hundredths / 100, self.hundredths % 100)
    }
}

/// Typed value of one board column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Date { date: NaiveDate },
    DateTime { date: NaiveDate, time: NaiveTime },
    Numeric(Hours),
}

impl FieldValue {
    /// Unambiguous textual form, used for fingerprinting.
    pub fn canonical(&self) -> String {
        match self {
            FieldValue::Text(text) => format!("text:{text}"),
            FieldValue::Date { date } => format!("date:{}", date.format("%Y-%m-%d")),
            FieldValue::DateTime { date, time } => format!(
                "datetime:{}T{}",
                date.format("%Y-%m-%d"),
                time.format("%H:%M:%S")
            ),
            FieldValue::Numeric(hours) => format!("numeric:{hours}"),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(text) => serializer.serialize_str(text),
            FieldValue::Date { date } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("date", &date.format("%Y-%m-%d").to_string())?;
                map.end()
            }
            FieldValue::DateTime { date, time } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("date", &date.format("%Y-%m-%d").to_string())?;
                map.serialize_entry("time", &time.format("%H:%M:%S").to_string())?;
                map.end()
            }
            FieldValue::Numeric(hours) => serializer.serialize_str(&hours.to_string()),
        }
    }
}

/// Ordered board column values for one attendance, plus the item name used
/// when the item is first created.
///
/// The item name is not part of the column values and is never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProjection {
    display_name: String,
    fields: Vec<(String, FieldValue)>,
}

impl FieldProjection {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            fields: Vec::new(),
        }
    }

    /// Sets a column. Re-setting a key replaces its value in place.
    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: FieldValue) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Column values as the JSON object the board API expects, in projection order.
    pub fn column_values_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&ColumnValues(&self.fields))
    }
}

struct ColumnValues<'a>(&'a [(String, FieldValue)]);

impl Serialize for ColumnValues<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
