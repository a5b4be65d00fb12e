// monday.com implementation of the BoardClient port.
//
// Responsibilities
// - Send create_item and change_multiple_column_values mutations over GraphQL.
// - Encode column values as the JSON string the API expects.
// - Classify failures: throttling and server errors are transport problems,
//   GraphQL errors are rejections, a create without an id is its own case.

use crate::modules::attendance_sync::core::ports::{BoardClient, BoardError};
use crate::modules::attendance_sync::core::projection::FieldProjection;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

const CREATE_ITEM: &str = "mutation CreateItem($boardId: ID!, $itemName: String!, $columnValues: JSON!) { \
     create_item(board_id: $boardId, item_name: $itemName, column_values: $columnValues) { id } }";

const CHANGE_COLUMN_VALUES: &str = "mutation ChangeColumnValues($itemId: ID!, $boardId: ID!, $columnValues: JSON!) { \
     change_multiple_column_values(item_id: $itemId, board_id: $boardId, column_values: $columnValues) { id } }";

#[derive(Debug, Clone)]
pub struct MondayClientConfig {
    pub api_url: String,
    pub api_token: String,
    pub board_id: String,
    pub timeout: Duration,
}

pub struct MondayClient {
    http: Client,
    config: MondayClientConfig,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

impl MondayClient {
    pub fn new(config: MondayClientConfig) -> Result<Self, BoardError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BoardError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    async fn execute(&self, query: &str, variables: Value) -> Result<Value, BoardError> {
        let response = self
            .http
            .post(&self.config.api_url)
            .header(AUTHORIZATION, &self.config.api_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| BoardError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| BoardError::Transport(e.to_string()))?;
        interpret_response(status, &body)
    }
}

#[async_trait]
impl BoardClient for MondayClient {
    async fn create_record(
        &self,
        board_id: &str,
        display_name: &str,
        projection: &FieldProjection,
    ) -> Result<String, BoardError> {
        let data = self
            .execute(
                CREATE_ITEM,
                json!({
                    "boardId": board_id,
                    "itemName": display_name,
                    "columnValues": encode_columns(projection)?,
                }),
            )
            .await?;
        let id = created_item_id(&data).ok_or(BoardError::MissingIdentifier)?;
        debug!(board_id, item_id = %id, "created board item");
        Ok(id)
    }

    async fn update_record(
        &self,
        downstream_id: &str,
        projection: &FieldProjection,
    ) -> Result<(), BoardError> {
        self.execute(
            CHANGE_COLUMN_VALUES,
            json!({
                "itemId": downstream_id,
                "boardId": self.config.board_id,
                "columnValues": encode_columns(projection)?,
            }),
        )
        .await?;
        debug!(item_id = downstream_id, "updated board item");
        Ok(())
    }
}

fn encode_columns(projection: &FieldProjection) -> Result<String, BoardError> {
    projection
        .column_values_json()
        .map_err(|e| BoardError::Rejected(format!("column values could not be encoded: {e}")))
}

fn interpret_response(status: u16, body: &str) -> Result<Value, BoardError> {
    if status == 429 || status >= 500 {
        return Err(BoardError::Transport(format!("board api returned {status}")));
    }

    let parsed: Option<GraphQlResponse> = serde_json::from_str(body).ok();
    if let Some(response) = &parsed {
        if !response.errors.is_empty() {
            let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(BoardError::Rejected(messages.join("; ")));
        }
        if let Some(message) = &response.error_message {
            return Err(BoardError::Rejected(message.clone()));
        }
    }
    if !(200..300).contains(&status) {
        return Err(BoardError::Rejected(format!("board api returned {status}")));
    }

    parsed
        .and_then(|response| response.data)
        .ok_or_else(|| BoardError::Rejected("response carried no data".into()))
}

fn created_item_id(data: &Value) -> Option<String> {
    match data.pointer("/create_item/id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
