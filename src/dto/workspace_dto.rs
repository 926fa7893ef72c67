use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateWorkspacePayload {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub subject: String,
    #[validate(length(min = 1))]
    pub term: String,
    pub due_at: Option<DateTime<Utc>>,
    pub dataset_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SetWorkspaceStatusPayload {
    #[validate(length(min = 1))]
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddMemberPayload {
    pub user_id: Uuid,
    #[validate(length(min = 1))]
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateVariantPayload {
    #[validate(length(min = 1))]
    pub code: String,
    #[validate(range(min = 1))]
    pub question_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BulkCreateSlotsPayload {
    #[validate(range(min = 1, max = 500))]
    pub count: i32,
}
