use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunAssignmentPayload {
    /// Same seed plus same state reproduces the identical assignment.
    pub seed: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkStalePayload {
    pub stale_after_hours: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TaskStatusPayload {
    #[validate(length(min = 1))]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskListQuery {
    pub assigned_to: Option<Uuid>,
    pub status: Option<String>,
}
