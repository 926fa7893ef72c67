use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// The deduplicated logical question. Identity-only: the editable payload
/// lives in the draft, engagement in comments/votes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CanonicalQuestion {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub question_type: String,
    pub created_by: Uuid,
    pub created_at: Option<DateTime<Utc>>,
    pub retired_at: Option<DateTime<Utc>>,
    pub merged_into: Option<Uuid>,
}

impl CanonicalQuestion {
    pub fn is_retired(&self) -> bool {
        self.retired_at.is_some()
    }
}

pub const PROVENANCE_MERGE: &str = "merge";
pub const PROVENANCE_SPLIT: &str = "split";
pub const PROVENANCE_SPLIT_MOVE: &str = "split_move";

/// Audit edge left behind by merge/split. On merge the losing draft content
/// is carried verbatim in `detail`; on split_move the moved slot ids are.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProvenanceRecord {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub kind: String,
    pub from_id: Uuid,
    pub to_id: Uuid,
    pub reason: Option<String>,
    pub detail: Option<JsonValue>,
    pub created_by: Uuid,
    pub created_at: Option<DateTime<Utc>>,
}
