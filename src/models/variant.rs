use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One distinct exam form (ordering/subset) within a workspace.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Variant {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub code: String,
    pub question_count: i32,
    pub created_at: Option<DateTime<Utc>>,
}
