use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// A permanent question-bank record promoted from a workspace canonical.
/// `canonical_question_id` is unique, which is what makes publishing
/// idempotent across partial or repeated runs.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BankQuestion {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub canonical_question_id: Uuid,
    pub question_type: String,
    pub prompt: String,
    pub solution: String,
    pub explanation: Option<String>,
    pub options: Option<JsonValue>,
    pub correct_choice: Option<i32>,
    pub attachments: Option<JsonValue>,
    pub published_at: Option<DateTime<Utc>>,
}
