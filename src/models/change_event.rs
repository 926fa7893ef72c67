use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// Outbox row for the change-notification channel. Consuming UIs use the
/// feed to refresh without polling; the engine stays correct without it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChangeEvent {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub canonical_question_id: Option<Uuid>,
    pub entity: String,
    pub action: String,
    pub payload: JsonValue,
    pub target_url: String,
    pub http_status: Option<i32>,
    pub response_body: Option<String>,
    pub attempts: Option<i32>,
    pub max_attempts: Option<i32>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
