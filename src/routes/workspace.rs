use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::workspace_dto::{
        AddMemberPayload, BulkCreateSlotsPayload, CreateVariantPayload, CreateWorkspacePayload,
        SetWorkspaceStatusPayload,
    },
    dto::dedup_dto::{LinkSlotPayload, OpenSlotPayload},
    dto::engagement_dto::{PresencePayload, PresenceQuery},
    error::Result,
    middleware::auth::Claims,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/workspaces",
    responses(
        (status = 201, description = "Workspace created, caller enrolled as moderator"),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_workspace(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateWorkspacePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = claims.user_id()?;
    let workspace = state.workspace_service.create(payload, user).await?;
    Ok((StatusCode::CREATED, Json(workspace)))
}

#[utoipa::path(
    patch,
    path = "/api/workspaces/{id}/status",
    params(("id" = Uuid, Path, description = "Workspace ID")),
    responses(
        (status = 200, description = "Status changed"),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Caller is not a moderator")
    )
)]
#[axum::debug_handler]
pub async fn set_workspace_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetWorkspaceStatusPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = claims.user_id()?;
    state.membership_service.require_moderator(id, user).await?;
    let workspace = state.workspace_service.set_status(id, &payload.status).await?;

    state
        .change_feed
        .record(id, None, "workspace", "status_changed", json!({"status": workspace.status}))
        .await;
    Ok(Json(workspace))
}

#[axum::debug_handler]
pub async fn add_member(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddMemberPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let actor = claims.user_id()?;
    let membership = state
        .membership_service
        .add_member(id, actor, payload.user_id, &payload.role)
        .await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

#[axum::debug_handler]
pub async fn list_members(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let user = claims.user_id()?;
    let members = state.membership_service.list_members(id, user).await?;
    Ok(Json(members))
}

#[utoipa::path(
    post,
    path = "/api/workspaces/{id}/variants",
    params(("id" = Uuid, Path, description = "Workspace ID")),
    responses(
        (status = 201, description = "Variant created"),
        (status = 409, description = "Variant code already exists")
    )
)]
#[axum::debug_handler]
pub async fn create_variant(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateVariantPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = claims.user_id()?;
    state.membership_service.require_moderator(id, user).await?;
    let variant = state.workspace_service.create_variant(id, payload).await?;
    Ok((StatusCode::CREATED, Json(variant)))
}

#[axum::debug_handler]
pub async fn list_variants(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let user = claims.user_id()?;
    state.membership_service.require_member(id, user).await?;
    let variants = state.workspace_service.list_variants(id).await?;
    Ok(Json(variants))
}

#[utoipa::path(
    post,
    path = "/api/variants/{id}/slots",
    params(("id" = Uuid, Path, description = "Variant ID")),
    responses(
        (status = 201, description = "Slots 1..count created unassigned"),
        (status = 409, description = "Variant already has slots")
    )
)]
#[axum::debug_handler]
pub async fn bulk_create_slots(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BulkCreateSlotsPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = claims.user_id()?;
    let variant = state.workspace_service.get_variant(id).await?;
    state
        .membership_service
        .require_moderator(variant.workspace_id, user)
        .await?;
    let slots = state.workspace_service.bulk_create_slots(id, payload.count).await?;

    state
        .change_feed
        .record(
            variant.workspace_id,
            None,
            "slot",
            "bulk_created",
            json!({"variant_id": id, "count": slots.len()}),
        )
        .await;
    Ok((StatusCode::CREATED, Json(slots)))
}

#[axum::debug_handler]
pub async fn list_slots_by_variant(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let user = claims.user_id()?;
    let variant = state.workspace_service.get_variant(id).await?;
    state
        .membership_service
        .require_member(variant.workspace_id, user)
        .await?;
    let slots = state.workspace_service.list_slots_by_variant(id).await?;
    Ok(Json(slots))
}

/// Opening a slot yields its canonical question, creating and linking a
/// fresh one on first open.
#[axum::debug_handler]
pub async fn open_slot(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OpenSlotPayload>,
) -> Result<impl IntoResponse> {
    let user = claims.user_id()?;
    let slot = state.workspace_service.get_slot(id).await?;
    state
        .membership_service
        .require_member(slot.workspace_id, user)
        .await?;

    let question_type = payload.question_type.as_deref().unwrap_or("mcq");
    let question = state.canonical_service.open_slot(id, user, question_type).await?;

    state
        .change_feed
        .record(
            slot.workspace_id,
            Some(question.id),
            "slot",
            "opened",
            json!({"slot_id": id}),
        )
        .await;
    Ok(Json(question))
}

/// Links an unlinked slot to an existing canonical question (the same
/// question recurring elsewhere in the exam).
#[axum::debug_handler]
pub async fn link_slot(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LinkSlotPayload>,
) -> Result<impl IntoResponse> {
    let user = claims.user_id()?;
    let slot = state.workspace_service.get_slot(id).await?;
    state
        .membership_service
        .require_member(slot.workspace_id, user)
        .await?;

    state
        .canonical_service
        .link_slot(id, payload.canonical_question_id)
        .await?;

    state
        .change_feed
        .record(
            slot.workspace_id,
            Some(payload.canonical_question_id),
            "slot",
            "linked",
            json!({"slot_id": id}),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn upsert_presence(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PresencePayload>,
) -> Result<impl IntoResponse> {
    let user = claims.user_id()?;
    state.membership_service.require_member(id, user).await?;

    // Best-effort from here on: the heartbeat itself can never fail the call.
    state
        .presence_service
        .upsert(id, payload.canonical_question_id, user, &payload.status)
        .await;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_presence(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Query(query): Query<PresenceQuery>,
) -> Result<impl IntoResponse> {
    let user = claims.user_id()?;
    state.membership_service.require_member(id, user).await?;

    let ttl = crate::config::get_config().presence_ttl_seconds;
    let rows = state
        .presence_service
        .list(id, query.canonical_question_id, ttl)
        .await?;
    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/api/workspaces/{id}/publish",
    params(("id" = Uuid, Path, description = "Workspace ID")),
    responses(
        (status = 200, description = "Publish outcome counts"),
        (status = 403, description = "Caller is not a moderator")
    )
)]
#[axum::debug_handler]
pub async fn publish_workspace(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let user = claims.user_id()?;
    state.membership_service.require_moderator(id, user).await?;
    let outcome = state.publish_service.publish_workspace(id).await?;

    state
        .change_feed
        .record(
            id,
            None,
            "workspace",
            "published",
            json!({"published": outcome.published, "already_published": outcome.already_published}),
        )
        .await;
    Ok(Json(outcome))
}
