mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use recon_backend::error::Error;
use recon_backend::models::draft::DraftContent;
use recon_backend::services::canonical_service::CanonicalService;
use recon_backend::services::draft_service::DraftService;
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

fn content(prompt: &str) -> DraftContent {
    DraftContent {
        prompt: prompt.to_string(),
        solution: "x = 2".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn optimistic_conflict_round_trip() {
    let Some(pool) = common::setup().await else { return };

    let moderator = Uuid::new_v4();
    let workspace = common::seed_workspace(&pool, moderator).await;
    let (_variant, slots) = common::seed_variant_with_slots(&pool, workspace.id, "A", 3).await;

    let canonical_service = CanonicalService::new(pool.clone());
    let question = canonical_service
        .open_slot(slots[0].id, moderator, "mcq")
        .await
        .expect("open slot");

    let drafts = DraftService::new(pool.clone());

    // First save lands at revision 1.
    let draft = drafts
        .upsert(question.id, moderator, content("Solve 2x = 4"))
        .await
        .expect("first save");
    assert_eq!(draft.revision, 1);

    // A second first-save must be rejected.
    let err = drafts
        .upsert(question.id, moderator, content("clobber"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    // Member X reads revision 1. Member Y commits, advancing to 2.
    let observed = drafts.get(question.id).await.expect("read").revision;
    let editor_y = Uuid::new_v4();
    let after_y = drafts
        .update_optimistic(question.id, editor_y, observed, content("Solve 2x = 4 (tidied)"))
        .await
        .expect("y writes");
    assert_eq!(after_y.revision, 2);

    // X's write from the stale revision conflicts and writes nothing.
    let editor_x = Uuid::new_v4();
    let err = drafts
        .update_optimistic(question.id, editor_x, observed, content("stale"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    let current = drafts.get(question.id).await.expect("re-read");
    // The losing write must not have advanced the revision.
    assert_eq!(current.revision, 2);
    assert_eq!(current.last_edited_by, editor_y);

    // X re-fetches and succeeds on top of the newer content.
    let after_x = drafts
        .update_optimistic(question.id, editor_x, current.revision, content("Solve 2x = 4, x = 2"))
        .await
        .expect("x retries");
    assert_eq!(after_x.revision, 3);
    assert_eq!(after_x.last_edited_by, editor_x);
}

#[tokio::test]
async fn stale_write_returns_409_over_http() {
    let Some(pool) = common::setup().await else { return };

    let moderator = Uuid::new_v4();
    let workspace = common::seed_workspace(&pool, moderator).await;
    let (_variant, slots) = common::seed_variant_with_slots(&pool, workspace.id, "B", 1).await;

    let canonical_service = CanonicalService::new(pool.clone());
    let question = canonical_service
        .open_slot(slots[0].id, moderator, "mcq")
        .await
        .expect("open slot");

    let drafts = DraftService::new(pool.clone());
    drafts
        .upsert(question.id, moderator, content("What is a heap?"))
        .await
        .expect("first save");
    drafts
        .update_optimistic(question.id, moderator, 1, content("What is a binary heap?"))
        .await
        .expect("advance to 2");

    let app_state = recon_backend::AppState::new(pool.clone());
    let app = Router::new()
        .route(
            "/api/questions/:id/draft",
            get(recon_backend::routes::draft::get_draft)
                .patch(recon_backend::routes::draft::update_draft_optimistic),
        )
        .layer(axum::middleware::from_fn(
            recon_backend::middleware::auth::require_bearer_auth,
        ))
        .with_state(app_state);

    let stale_body = json!({
        "prev_revision": 1,
        "content": { "prompt": "stale over http", "solution": "n/a" }
    });
    let req = Request::builder()
        .method("PATCH")
        .uri(format!("/api/questions/{}/draft", question.id))
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", common::token(moderator)))
        .body(Body::from(stale_body.to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // The stored draft is untouched at revision 2.
    let req = Request::builder()
        .method("GET")
        .uri(format!("/api/questions/{}/draft", question.id))
        .header("authorization", format!("Bearer {}", common::token(moderator)))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body: JsonValue = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["revision"], 2);
}
