use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const STATUS_ASSIGNED: &str = "assigned";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_SUBMITTED: &str = "submitted";
pub const STATUS_DONE: &str = "done";
pub const STATUS_STALE: &str = "stale";

/// A slot may hold at most one task in assigned/in_progress/submitted,
/// enforced by a partial unique index on assignment_tasks.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssignmentTask {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub slot_id: Uuid,
    pub assigned_to: Uuid,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}
