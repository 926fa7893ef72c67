use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const KIND_MCQ: &str = "mcq";
pub const KIND_FREE_TEXT: &str = "free_text";

/// One active vote per (question, user, kind): a user may hold an MCQ vote
/// and a free-text vote on the same question simultaneously.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vote {
    pub id: Uuid,
    pub canonical_question_id: Uuid,
    pub user_id: Uuid,
    pub vote_kind: String,
    pub mcq_choice: Option<i32>,
    pub free_text_answer: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
