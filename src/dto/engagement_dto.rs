use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddCommentPayload {
    #[validate(length(min = 1, max = 4000))]
    pub content: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct McqVotePayload {
    #[validate(range(min = 0))]
    pub choice: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FreeTextVotePayload {
    #[validate(length(min = 1, max = 4000))]
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresencePayload {
    pub canonical_question_id: Option<Uuid>,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresenceQuery {
    pub canonical_question_id: Option<Uuid>,
}
