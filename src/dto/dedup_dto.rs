use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergePayload {
    pub from_id: Uuid,
    pub to_id: Uuid,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SplitMoveSlotsPayload {
    pub from_id: Uuid,
    pub to_id: Uuid,
    #[validate(length(min = 1))]
    pub slot_ids: Vec<Uuid>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSlotPayload {
    pub question_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSlotPayload {
    pub canonical_question_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimilarQuery {
    pub threshold: Option<f64>,
    pub limit: Option<usize>,
}
