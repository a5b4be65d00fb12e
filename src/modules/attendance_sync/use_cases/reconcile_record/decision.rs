use serde::Serialize;

/// What the board needs for one attendance, derived from the identity table alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Create,
    Update { downstream_id: String },
    Skip { downstream_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
}
