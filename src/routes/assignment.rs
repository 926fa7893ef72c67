use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::assignment_dto::{MarkStalePayload, RunAssignmentPayload, TaskListQuery, TaskStatusPayload},
    error::Result,
    middleware::auth::Claims,
    models::membership::ROLE_MODERATOR,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/workspaces/{id}/assignment/run",
    params(("id" = Uuid, Path, description = "Workspace ID")),
    responses(
        (status = 200, description = "Tasks created for every slot needing work"),
        (status = 403, description = "Caller is not a moderator")
    )
)]
#[axum::debug_handler]
pub async fn run_assignment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RunAssignmentPayload>,
) -> Result<impl IntoResponse> {
    let user = claims.user_id()?;
    state.membership_service.require_moderator(id, user).await?;

    let tasks = state
        .assignment_service
        .run_assignment(id, payload.seed.as_deref())
        .await?;

    state
        .change_feed
        .record(id, None, "task", "assigned", json!({"created": tasks.len()}))
        .await;
    Ok(Json(json!({ "created": tasks.len(), "tasks": tasks })))
}

#[utoipa::path(
    post,
    path = "/api/workspaces/{id}/assignment/mark-stale",
    params(("id" = Uuid, Path, description = "Workspace ID")),
    responses(
        (status = 200, description = "Count of tasks moved to stale")
    )
)]
#[axum::debug_handler]
pub async fn mark_stale_tasks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MarkStalePayload>,
) -> Result<impl IntoResponse> {
    let user = claims.user_id()?;
    state.membership_service.require_moderator(id, user).await?;

    let hours = payload
        .stale_after_hours
        .unwrap_or_else(|| crate::config::get_config().stale_task_hours);
    let count = state.assignment_service.mark_stale_tasks(id, hours).await?;

    state
        .change_feed
        .record(id, None, "task", "stale", json!({"count": count}))
        .await;
    Ok(Json(json!({ "stale": count })))
}

#[axum::debug_handler]
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Query(query): Query<TaskListQuery>,
) -> Result<impl IntoResponse> {
    let user = claims.user_id()?;
    state.membership_service.require_member(id, user).await?;
    let tasks = state
        .assignment_service
        .list_tasks(id, query.assigned_to, query.status)
        .await?;
    Ok(Json(tasks))
}

#[axum::debug_handler]
pub async fn update_task_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TaskStatusPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = claims.user_id()?;
    let task = state.assignment_service.get_task(id).await?;
    let membership = state
        .membership_service
        .require_member(task.workspace_id, user)
        .await?;

    let updated = state
        .assignment_service
        .update_status(id, user, &payload.status, membership.role == ROLE_MODERATOR)
        .await?;

    state
        .change_feed
        .record(
            task.workspace_id,
            None,
            "task",
            "updated",
            json!({"task_id": id, "status": updated.status}),
        )
        .await;
    Ok(Json(updated))
}
