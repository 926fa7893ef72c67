use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const STATUS_VIEWING: &str = "viewing";
pub const STATUS_EDITING: &str = "editing";

/// Advisory heartbeat row. Never authoritative for any business decision;
/// readers drop rows older than the configured TTL instead of the engine
/// deleting them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Presence {
    pub workspace_id: Uuid,
    pub canonical_question_id: Option<Uuid>,
    pub user_id: Uuid,
    pub status: String,
    pub last_heartbeat_at: DateTime<Utc>,
}
