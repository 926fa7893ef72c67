use crate::models::draft::{Draft, DraftContent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveDraftPayload {
    pub content: DraftContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDraftPayload {
    /// The revision this client last observed. On mismatch the write is
    /// rejected wholesale and the client re-fetches.
    pub prev_revision: i32,
    pub content: DraftContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftResponse {
    pub canonical_question_id: Uuid,
    pub content: JsonValue,
    pub revision: i32,
    pub last_edited_by: Uuid,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Draft> for DraftResponse {
    fn from(draft: Draft) -> Self {
        Self {
            canonical_question_id: draft.canonical_question_id,
            content: draft.content,
            revision: draft.revision,
            last_edited_by: draft.last_edited_by,
            updated_at: draft.updated_at,
        }
    }
}
