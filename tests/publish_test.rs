mod common;

use recon_backend::models::draft::DraftContent;
use recon_backend::services::canonical_service::CanonicalService;
use recon_backend::services::draft_service::DraftService;
use recon_backend::services::publish_service::PublishService;
use uuid::Uuid;

#[tokio::test]
async fn publish_is_idempotent_and_skips_incomplete_drafts() {
    let Some(pool) = common::setup().await else { return };

    let moderator = Uuid::new_v4();
    let workspace = common::seed_workspace(&pool, moderator).await;
    let (_variant, slots) = common::seed_variant_with_slots(&pool, workspace.id, "A", 3).await;

    let canonicals = CanonicalService::new(pool.clone());
    let drafts = DraftService::new(pool.clone());
    let publisher = PublishService::new(pool.clone());

    let complete = canonicals.open_slot(slots[0].id, moderator, "mcq").await.unwrap();
    drafts
        .upsert(
            complete.id,
            moderator,
            DraftContent {
                prompt: "State the pumping lemma".into(),
                solution: "For every regular language ...".into(),
                options: vec!["A".into(), "B".into()],
                correct_choice: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Prompt but no solution: not complete enough to promote.
    let incomplete = canonicals.open_slot(slots[1].id, moderator, "mcq").await.unwrap();
    drafts
        .upsert(
            incomplete.id,
            moderator,
            DraftContent {
                prompt: "Half-remembered question".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Slot 3 was never opened at all.
    let outcome = publisher.publish_workspace(workspace.id).await.expect("publish");
    assert_eq!(outcome.published, 1);
    assert_eq!(outcome.already_published, 0);
    assert_eq!(outcome.skipped_incomplete, 1);

    let status: String = sqlx::query_scalar(r#"SELECT status FROM workspaces WHERE id = $1"#)
        .bind(workspace.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "published");

    // Publishing again produces the same bank set: no duplicates.
    let again = publisher.publish_workspace(workspace.id).await.expect("republish");
    assert_eq!(again.published, 0);
    assert_eq!(again.already_published, 1);
    assert_eq!(again.skipped_incomplete, 1);

    let bank_count: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM bank_questions WHERE workspace_id = $1"#)
            .bind(workspace.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(bank_count, 1);

    let (prompt, correct_choice): (String, Option<i32>) = sqlx::query_as(
        r#"SELECT prompt, correct_choice FROM bank_questions WHERE canonical_question_id = $1"#,
    )
    .bind(complete.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(prompt, "State the pumping lemma");
    assert_eq!(correct_choice, Some(0));
}

#[tokio::test]
async fn draft_workspace_cannot_publish() {
    let Some(pool) = common::setup().await else { return };

    let moderator = Uuid::new_v4();
    let service = recon_backend::services::workspace_service::WorkspaceService::new(pool.clone());
    let workspace = service
        .create(
            recon_backend::dto::workspace_dto::CreateWorkspacePayload {
                title: "Unstarted".into(),
                subject: "CS".into(),
                term: "2026-1".into(),
                due_at: None,
                dataset_ref: None,
            },
            moderator,
        )
        .await
        .expect("workspace");

    let publisher = PublishService::new(pool.clone());
    let err = publisher.publish_workspace(workspace.id).await.unwrap_err();
    assert!(matches!(err, recon_backend::error::Error::BadRequest(_)));
}
