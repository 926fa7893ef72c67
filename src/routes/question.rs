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
    dto::dedup_dto::{MergePayload, SimilarQuery, SplitMoveSlotsPayload},
    dto::engagement_dto::{AddCommentPayload, FreeTextVotePayload, McqVotePayload},
    error::Result,
    middleware::auth::Claims,
    AppState,
};

const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.3;
const DEFAULT_SIMILARITY_LIMIT: usize = 10;

#[axum::debug_handler]
pub async fn get_canonical_question(
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
    Ok(Json(question))
}

/// Follows merge provenance to the surviving record; the answer for clients
/// holding an id that was merged away.
#[axum::debug_handler]
pub async fn resolve_canonical_question(
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
    let resolved = state.canonical_service.resolve(id).await?;
    Ok(Json(resolved))
}

#[axum::debug_handler]
pub async fn list_provenance(
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
    let records = state.canonical_service.list_provenance(id).await?;
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/api/questions/{id}/similar",
    params(
        ("id" = Uuid, Path, description = "Canonical question ID"),
        ("threshold" = Option<f64>, Query, description = "Minimum similarity, within [0, 1]"),
        ("limit" = Option<usize>, Query, description = "Maximum candidates returned")
    ),
    responses(
        (status = 200, description = "Ranked duplicate suggestions, descending similarity")
    )
)]
#[axum::debug_handler]
pub async fn find_similar_canonicals(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Query(query): Query<SimilarQuery>,
) -> Result<impl IntoResponse> {
    let user = claims.user_id()?;
    let question = state.canonical_service.get(id).await?;
    state
        .membership_service
        .require_member(question.workspace_id, user)
        .await?;

    let candidates = state
        .similarity_service
        .find_similar(
            id,
            query.threshold.unwrap_or(DEFAULT_SIMILARITY_THRESHOLD),
            query.limit.unwrap_or(DEFAULT_SIMILARITY_LIMIT),
        )
        .await?;
    Ok(Json(candidates))
}

#[utoipa::path(
    post,
    path = "/api/questions/merge",
    responses(
        (status = 200, description = "Questions merged; provenance record returned"),
        (status = 403, description = "Caller is not a moderator"),
        (status = 404, description = "A side of the merge is missing or already merged away")
    )
)]
#[axum::debug_handler]
pub async fn merge_canonicals(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<MergePayload>,
) -> Result<impl IntoResponse> {
    let user = claims.user_id()?;
    let from = state.canonical_service.get(payload.from_id).await?;
    state
        .membership_service
        .require_moderator(from.workspace_id, user)
        .await?;

    let provenance = state
        .canonical_service
        .merge(payload.from_id, payload.to_id, user, payload.reason)
        .await?;

    state
        .change_feed
        .record(
            from.workspace_id,
            Some(payload.to_id),
            "canonical",
            "merged",
            json!({"from": payload.from_id, "to": payload.to_id}),
        )
        .await;
    Ok(Json(provenance))
}

#[axum::debug_handler]
pub async fn create_split_canonical(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let user = claims.user_id()?;
    let from = state.canonical_service.get(id).await?;
    state
        .membership_service
        .require_moderator(from.workspace_id, user)
        .await?;

    let question = state.canonical_service.create_split(id, user).await?;

    state
        .change_feed
        .record(
            from.workspace_id,
            Some(question.id),
            "canonical",
            "split",
            json!({"from": id, "to": question.id}),
        )
        .await;
    Ok((StatusCode::CREATED, Json(question)))
}

#[axum::debug_handler]
pub async fn split_move_slots(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SplitMoveSlotsPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = claims.user_id()?;
    let from = state.canonical_service.get(payload.from_id).await?;
    state
        .membership_service
        .require_moderator(from.workspace_id, user)
        .await?;

    let provenance = state
        .canonical_service
        .split_move_slots(
            payload.from_id,
            payload.to_id,
            &payload.slot_ids,
            user,
            payload.reason,
        )
        .await?;

    state
        .change_feed
        .record(
            from.workspace_id,
            Some(payload.to_id),
            "slot",
            "moved",
            json!({"from": payload.from_id, "to": payload.to_id, "slot_ids": payload.slot_ids}),
        )
        .await;
    Ok(Json(provenance))
}

#[axum::debug_handler]
pub async fn list_comments(
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
    let comments = state.comment_service.list(id).await?;
    Ok(Json(comments))
}

#[axum::debug_handler]
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddCommentPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = claims.user_id()?;
    let question = state.canonical_service.get(id).await?;
    state
        .membership_service
        .require_member(question.workspace_id, user)
        .await?;

    let comment = state
        .comment_service
        .add(id, user, &payload.content, payload.parent_id)
        .await?;

    state
        .change_feed
        .record(
            question.workspace_id,
            Some(id),
            "comment",
            "created",
            json!({"comment_id": comment.id}),
        )
        .await;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[axum::debug_handler]
pub async fn list_votes(
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
    let votes = state.vote_service.list(id).await?;
    Ok(Json(votes))
}

#[axum::debug_handler]
pub async fn upsert_mcq_vote(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<McqVotePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = claims.user_id()?;
    let question = state.canonical_service.get(id).await?;
    state
        .membership_service
        .require_member(question.workspace_id, user)
        .await?;

    let vote = state.vote_service.upsert_mcq(id, user, payload.choice).await?;

    state
        .change_feed
        .record(question.workspace_id, Some(id), "vote", "upserted", json!({"kind": "mcq"}))
        .await;
    Ok(Json(vote))
}

#[axum::debug_handler]
pub async fn upsert_free_text_vote(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FreeTextVotePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = claims.user_id()?;
    let question = state.canonical_service.get(id).await?;
    state
        .membership_service
        .require_member(question.workspace_id, user)
        .await?;

    let vote = state
        .vote_service
        .upsert_free_text(id, user, &payload.answer)
        .await?;

    state
        .change_feed
        .record(question.workspace_id, Some(id), "vote", "upserted", json!({"kind": "free_text"}))
        .await;
    Ok(Json(vote))
}
