// Personio implementation of the AttendanceSource port.
//
// Responsibilities
// - Acquire a bearer token from the auth endpoint and reuse it until the API rejects it.
// - Page through company attendances for a date window.
// - Look up a single employee by id.
// - Map every transport or shape problem onto UpstreamError.

use crate::modules::attendance_sync::core::attendance::{EmployeeProfile, UpstreamRecord};
use crate::modules::attendance_sync::core::ports::{AttendanceSource, UpstreamError};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const PAGE_SIZE: usize = 200;
const MAX_PAGES: usize = 100;

#[derive(Debug, Clone)]
pub struct PersonioClientConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout: Duration,
}

pub struct PersonioClient {
    http: Client,
    config: PersonioClientConfig,
    token: Mutex<Option<String>>,
}

impl PersonioClient {
    pub fn new(config: PersonioClientConfig) -> Result<Self, UpstreamError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            config,
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn token(&self) -> Result<String, UpstreamError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let response = self
            .http
            .post(self.url("auth"))
            .json(&json!({
                "client_id": self.config.client_id,
                "client_secret": self.config.client_secret,
            }))
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Auth(format!("auth endpoint returned {status}")));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;
        let token = token_from_body(&body)?;
        debug!("acquired personio token");
        *cached = Some(token.clone());
        Ok(token)
    }

    /// `Ok(None)` when the resource does not exist. A rejected token is
    /// dropped and re-acquired once.
    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<Value>, UpstreamError> {
        for attempt in 0..2 {
            let token = self.token().await?;
            let response = self
                .http
                .get(self.url(path))
                .bearer_auth(&token)
                .query(query)
                .send()
                .await
                .map_err(|e| UpstreamError::Transport(e.to_string()))?;

            match response.status() {
                StatusCode::UNAUTHORIZED if attempt == 0 => {
                    warn!(path, "personio token rejected; re-authenticating");
                    self.token.lock().await.take();
                }
                StatusCode::UNAUTHORIZED => {
                    return Err(UpstreamError::Auth(format!("{path} rejected a fresh token")));
                }
                StatusCode::NOT_FOUND => return Ok(None),
                status if !status.is_success() => {
                    return Err(UpstreamError::Transport(format!("{path} returned {status}")));
                }
                _ => {
                    let body = response
                        .json()
                        .await
                        .map_err(|e| UpstreamError::Decode(e.to_string()))?;
                    return Ok(Some(body));
                }
            }
        }
        Err(UpstreamError::Auth(format!("{path} rejected every token")))
    }
}

#[async_trait]
impl AttendanceSource for PersonioClient {
    async fn fetch_attendance(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<UpstreamRecord>, UpstreamError> {
        let mut records = Vec::new();
        let mut offset = 0;
        for _ in 0..MAX_PAGES {
            let query = [
                ("start_date", start.format("%Y-%m-%d").to_string()),
                ("end_date", end.format("%Y-%m-%d").to_string()),
                ("limit", PAGE_SIZE.to_string()),
                ("offset", offset.to_string()),
            ];
            let body = self
                .get_json("company/attendances", &query)
                .await?
                .ok_or_else(|| UpstreamError::Decode("attendances endpoint not found".into()))?;
            let rows = body
                .get("data")
                .and_then(Value::as_array)
                .ok_or_else(|| UpstreamError::Decode("attendance response has no data array".into()))?;

            records.extend(rows.iter().filter_map(attendance_from_row));
            if rows.len() < PAGE_SIZE {
                return Ok(records);
            }
            offset += rows.len();
        }
        warn!(pages = MAX_PAGES, "attendance paging stopped at the page limit");
        Ok(records)
    }

    async fn fetch_employee(&self, employee_id: &str) -> Result<EmployeeProfile, UpstreamError> {
        let body = self
            .get_json(&format!("company/employees/{employee_id}"), &[])
            .await?
            .ok_or_else(|| UpstreamError::EmployeeNotFound(employee_id.to_string()))?;
        employee_from_body(employee_id, &body)
    }
}

fn token_from_body(body: &Value) -> Result<String, UpstreamError> {
    body.pointer("/data/token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| UpstreamError::Auth("auth response carried no token".into()))
}

/// Strings and numbers as text; `{ "value": .. }` wrappers are unwrapped.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Object(map) => map.get("value").and_then(scalar),
        _ => None,
    }
}

fn attendance_from_row(row: &Value) -> Option<UpstreamRecord> {
    let attributes = row.get("attributes").unwrap_or(&Value::Null);
    let id = row
        .get("id")
        .and_then(scalar)
        .or_else(|| attributes.get("id").and_then(scalar));
    let employee_id = attributes.get("employee").and_then(|e| {
        scalar(e).or_else(|| e.pointer("/attributes/id").and_then(scalar))
    });
    let date = attributes.get("date").and_then(scalar);

    match (id, employee_id, date) {
        (Some(id), Some(employee_id), Some(date)) => Some(UpstreamRecord {
            id,
            id_v2: attributes.get("id_v2").and_then(scalar),
            employee_id,
            date,
            start_time: attributes.get("start_time").and_then(scalar),
            end_time: attributes.get("end_time").and_then(scalar),
        }),
        _ => {
            warn!(row = %row, "skipping attendance without id, employee or date");
            None
        }
    }
}

fn employee_from_body(employee_id: &str, body: &Value) -> Result<EmployeeProfile, UpstreamError> {
    let attributes = body
        .pointer("/data/attributes")
        .ok_or_else(|| UpstreamError::Decode(format!("employee {employee_id} has no attributes")))?;
    let field = |name: &str| attributes.get(name).and_then(scalar);
    Ok(EmployeeProfile {
        id: field("id").unwrap_or_else(|| employee_id.to_string()),
        first_name: field("first_name"),
        last_name: field("last_name"),
        email: field("email"),
    })
}
