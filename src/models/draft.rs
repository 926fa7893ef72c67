use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// The single editable document owned by a canonical question.
/// `revision` increases by exactly 1 per successful write; writers must hold
/// the revision they last observed (optimistic concurrency).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Draft {
    pub canonical_question_id: Uuid,
    pub content: JsonValue,
    pub revision: i32,
    pub last_edited_by: Uuid,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftContent {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub solution: String,
    pub explanation: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_choice: Option<i32>,
    #[serde(default)]
    pub attachments: Vec<String>,
}
