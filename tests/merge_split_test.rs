mod common;

use recon_backend::error::Error;
use recon_backend::models::draft::DraftContent;
use recon_backend::services::canonical_service::CanonicalService;
use recon_backend::services::comment_service::CommentService;
use recon_backend::services::draft_service::DraftService;
use recon_backend::services::vote_service::VoteService;
use recon_backend::services::workspace_service::WorkspaceService;
use uuid::Uuid;

fn content(prompt: &str) -> DraftContent {
    DraftContent {
        prompt: prompt.to_string(),
        solution: "42".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn merge_reparents_everything_and_retires_the_source() {
    let Some(pool) = common::setup().await else { return };

    let moderator = Uuid::new_v4();
    let workspace = common::seed_workspace(&pool, moderator).await;
    let (_variant, slots) = common::seed_variant_with_slots(&pool, workspace.id, "A", 4).await;

    let canonicals = CanonicalService::new(pool.clone());
    let drafts = DraftService::new(pool.clone());
    let comments = CommentService::new(pool.clone());
    let votes = VoteService::new(pool.clone());
    let workspaces = WorkspaceService::new(pool.clone());

    // Two members independently reconstructed the "same" question.
    let a = canonicals.open_slot(slots[0].id, moderator, "mcq").await.unwrap();
    let b = canonicals.open_slot(slots[1].id, moderator, "mcq").await.unwrap();
    canonicals.link_slot(slots[2].id, a.id).await.unwrap();

    drafts.upsert(a.id, moderator, content("What is six times seven")).await.unwrap();
    drafts.upsert(b.id, moderator, content("what is 6 * 7")).await.unwrap();

    let commenter = Uuid::new_v4();
    comments.add(a.id, commenter, "same as question 2?", None).await.unwrap();
    let voter = Uuid::new_v4();
    votes.upsert_mcq(a.id, voter, 1).await.unwrap();
    votes.upsert_mcq(b.id, voter, 3).await.unwrap();
    votes.upsert_free_text(a.id, voter, "42").await.unwrap();

    let provenance = canonicals
        .merge(a.id, b.id, moderator, Some("duplicate of b".into()))
        .await
        .expect("merge");
    assert_eq!(provenance.from_id, a.id);
    assert_eq!(provenance.to_id, b.id);
    // The losing draft survives in the provenance record.
    let detail = provenance.detail.expect("superseded draft kept");
    assert_eq!(
        detail["superseded_draft"]["prompt"],
        "What is six times seven"
    );

    // Every slot of A now points at B; no slot still references A.
    for slot_id in [slots[0].id, slots[1].id, slots[2].id] {
        let slot = workspaces.get_slot(slot_id).await.unwrap();
        assert_eq!(slot.canonical_question_id, Some(b.id));
    }

    // Comments moved; votes moved with the (user, kind) collision dropped in
    // favor of B's own vote.
    let moved_comments = comments.list(b.id).await.unwrap();
    assert_eq!(moved_comments.len(), 1);
    let moved_votes = votes.list(b.id).await.unwrap();
    assert_eq!(moved_votes.len(), 2);
    let mcq = moved_votes.iter().find(|v| v.vote_kind == "mcq").unwrap();
    assert_eq!(mcq.mcq_choice, Some(3));

    // A is retired, not deleted: still resolvable through provenance.
    let retired = canonicals.get(a.id).await.unwrap();
    assert!(retired.retired_at.is_some());
    assert_eq!(retired.merged_into, Some(b.id));
    let resolved = canonicals.resolve(a.id).await.unwrap();
    assert_eq!(resolved.id, b.id);

    // B keeps its own draft.
    let surviving = drafts.get(b.id).await.unwrap();
    assert_eq!(surviving.content["prompt"], "what is 6 * 7");
    let err = drafts.get(a.id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    // Merging the retired record again fails cleanly.
    let err = canonicals.merge(a.id, b.id, moderator, None).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn split_moves_exactly_the_named_slots() {
    let Some(pool) = common::setup().await else { return };

    let moderator = Uuid::new_v4();
    let workspace = common::seed_workspace(&pool, moderator).await;
    let (_variant, slots) = common::seed_variant_with_slots(&pool, workspace.id, "A", 4).await;

    let canonicals = CanonicalService::new(pool.clone());
    let comments = CommentService::new(pool.clone());
    let workspaces = WorkspaceService::new(pool.clone());

    let a = canonicals.open_slot(slots[0].id, moderator, "mcq").await.unwrap();
    canonicals.link_slot(slots[1].id, a.id).await.unwrap();
    canonicals.link_slot(slots[2].id, a.id).await.unwrap();
    comments.add(a.id, moderator, "slot 3 is a different question", None).await.unwrap();

    let fresh = canonicals.create_split(a.id, moderator).await.expect("split");
    assert_eq!(fresh.workspace_id, workspace.id);

    canonicals
        .split_move_slots(a.id, fresh.id, &[slots[2].id], moderator, Some("not the same".into()))
        .await
        .expect("move");

    // Exactly the named slot moved.
    assert_eq!(
        workspaces.get_slot(slots[2].id).await.unwrap().canonical_question_id,
        Some(fresh.id)
    );
    assert_eq!(
        workspaces.get_slot(slots[0].id).await.unwrap().canonical_question_id,
        Some(a.id)
    );
    assert_eq!(
        workspaces.get_slot(slots[1].id).await.unwrap().canonical_question_id,
        Some(a.id)
    );

    // A's comments are untouched by the split.
    assert_eq!(comments.list(a.id).await.unwrap().len(), 1);
    assert!(comments.list(fresh.id).await.unwrap().is_empty());

    // Moving a slot that is not linked to the source fails whole.
    let err = canonicals
        .split_move_slots(a.id, fresh.id, &[slots[2].id, slots[3].id], moderator, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
    // And nothing moved as a side effect of the failed call.
    assert_eq!(
        workspaces.get_slot(slots[3].id).await.unwrap().canonical_question_id,
        None
    );
}
