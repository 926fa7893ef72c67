use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const ROLE_MODERATOR: &str = "moderator";
pub const ROLE_CONTRIBUTOR: &str = "contributor";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub created_at: Option<DateTime<Utc>>,
}
