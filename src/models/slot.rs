use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const STATUS_UNASSIGNED: &str = "unassigned";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETE: &str = "complete";
pub const STATUS_AUTO_LINKED: &str = "auto_linked";

/// A numbered position within a variant. A slot is a position, not content:
/// many slots may point at the same canonical question.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Slot {
    pub id: Uuid,
    pub variant_id: Uuid,
    pub workspace_id: Uuid,
    pub slot_number: i32,
    pub canonical_question_id: Option<Uuid>,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
