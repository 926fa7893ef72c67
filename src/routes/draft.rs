use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    dto::draft_dto::{DraftResponse, SaveDraftPayload, UpdateDraftPayload},
    error::Result,
    middleware::auth::Claims,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/questions/{id}/draft",
    params(("id" = Uuid, Path, description = "Canonical question ID")),
    responses(
        (status = 200, description = "Current draft content and revision"),
        (status = 404, description = "No draft yet")
    )
)]
#[axum::debug_handler]
pub async fn get_draft(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let user = claims.user_id()?;
    let question = state.canonical_service.get(id).await?;
    state
        .membership_service
        .require_member(question.workspace_id, user)
        .await?;
    let draft = state.draft_service.get(id).await?;
    Ok(Json(DraftResponse::from(draft)))
}

#[utoipa::path(
    put,
    path = "/api/questions/{id}/draft",
    params(("id" = Uuid, Path, description = "Canonical question ID")),
    responses(
        (status = 201, description = "First draft created at revision 1"),
        (status = 409, description = "Draft already exists; use the optimistic update")
    )
)]
#[axum::debug_handler]
pub async fn upsert_draft(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SaveDraftPayload>,
) -> Result<impl IntoResponse> {
    let user = claims.user_id()?;
    let question = state.canonical_service.get(id).await?;
    state
        .membership_service
        .require_member(question.workspace_id, user)
        .await?;

    let draft = state.draft_service.upsert(id, user, payload.content).await?;

    state
        .change_feed
        .record(
            question.workspace_id,
            Some(id),
            "draft",
            "created",
            json!({"revision": draft.revision}),
        )
        .await;
    Ok((StatusCode::CREATED, Json(DraftResponse::from(draft))))
}

/// The optimistic write path. Each autosave flush lands here with the
/// revision the client last observed; a 409 means reload, reconcile by hand,
/// and retry.
#[utoipa::path(
    patch,
    path = "/api/questions/{id}/draft",
    params(("id" = Uuid, Path, description = "Canonical question ID")),
    responses(
        (status = 200, description = "Write accepted, revision advanced by 1"),
        (status = 409, description = "Revision mismatch: someone else committed first")
    )
)]
#[axum::debug_handler]
pub async fn update_draft_optimistic(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDraftPayload>,
) -> Result<impl IntoResponse> {
    let user = claims.user_id()?;
    let question = state.canonical_service.get(id).await?;
    state
        .membership_service
        .require_member(question.workspace_id, user)
        .await?;

    let draft = state
        .draft_service
        .update_optimistic(id, user, payload.prev_revision, payload.content)
        .await?;

    state
        .change_feed
        .record(
            question.workspace_id,
            Some(id),
            "draft",
            "updated",
            json!({"revision": draft.revision}),
        )
        .await;
    Ok(Json(DraftResponse::from(draft)))
}
