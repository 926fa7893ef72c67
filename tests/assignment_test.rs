mod common;

use recon_backend::services::assignment_service::AssignmentService;
use std::collections::HashMap;
use uuid::Uuid;

#[tokio::test]
async fn assignment_is_fair_and_never_double_books_a_slot() {
    let Some(pool) = common::setup().await else { return };

    let moderator = Uuid::new_v4();
    let workspace = common::seed_workspace(&pool, moderator).await;
    let contributor = common::add_contributor(&pool, workspace.id, moderator).await;
    let (_variant, slots) = common::seed_variant_with_slots(&pool, workspace.id, "A", 10).await;

    let assignments = AssignmentService::new(pool.clone());

    let tasks = assignments
        .run_assignment(workspace.id, Some("t1"))
        .await
        .expect("run");
    assert_eq!(tasks.len(), 10);

    // Two members, ten slots: exactly five each.
    let mut per_member: HashMap<Uuid, usize> = HashMap::new();
    for task in &tasks {
        *per_member.entry(task.assigned_to).or_default() += 1;
    }
    assert_eq!(per_member.get(&moderator), Some(&5));
    assert_eq!(per_member.get(&contributor), Some(&5));

    // Every slot got exactly one task.
    let mut per_slot: HashMap<Uuid, usize> = HashMap::new();
    for task in &tasks {
        *per_slot.entry(task.slot_id).or_default() += 1;
    }
    assert_eq!(per_slot.len(), 10);
    assert!(per_slot.values().all(|&n| n == 1));
    assert!(slots.iter().all(|s| per_slot.contains_key(&s.id)));

    // A second run with active tasks everywhere creates nothing.
    let again = assignments
        .run_assignment(workspace.id, Some("t1"))
        .await
        .expect("re-run");
    assert!(again.is_empty());

    let active: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM assignment_tasks
           WHERE workspace_id = $1 AND status IN ('assigned', 'in_progress', 'submitted')"#,
    )
    .bind(workspace.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(active, 10);
}

#[tokio::test]
async fn stale_tasks_free_their_slots_for_the_next_run() {
    let Some(pool) = common::setup().await else { return };

    let moderator = Uuid::new_v4();
    let workspace = common::seed_workspace(&pool, moderator).await;
    let (_variant, _slots) = common::seed_variant_with_slots(&pool, workspace.id, "A", 3).await;

    let assignments = AssignmentService::new(pool.clone());
    let tasks = assignments
        .run_assignment(workspace.id, Some("t1"))
        .await
        .expect("run");
    assert_eq!(tasks.len(), 3);

    // Nothing is stale yet.
    let none = assignments
        .mark_stale_tasks(workspace.id, 24)
        .await
        .expect("sweep");
    assert_eq!(none, 0);

    // Backdate one task past the threshold, as if abandoned for 25 hours.
    sqlx::query(
        r#"UPDATE assignment_tasks SET updated_at = NOW() - INTERVAL '25 hours' WHERE id = $1"#,
    )
    .bind(tasks[0].id)
    .execute(&pool)
    .await
    .unwrap();

    let swept = assignments
        .mark_stale_tasks(workspace.id, 24)
        .await
        .expect("sweep");
    assert_eq!(swept, 1);

    let stale_status: String =
        sqlx::query_scalar(r#"SELECT status FROM assignment_tasks WHERE id = $1"#)
            .bind(tasks[0].id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(stale_status, "stale");

    // The freed slot is picked up by the next run, and only that slot.
    let reassigned = assignments
        .run_assignment(workspace.id, Some("t2"))
        .await
        .expect("re-run");
    assert_eq!(reassigned.len(), 1);
    assert_eq!(reassigned[0].slot_id, tasks[0].slot_id);

    // Still at most one active task per slot.
    let max_active: i64 = sqlx::query_scalar(
        r#"SELECT COALESCE(MAX(cnt), 0) FROM (
               SELECT COUNT(*) AS cnt FROM assignment_tasks
               WHERE workspace_id = $1 AND status IN ('assigned', 'in_progress', 'submitted')
               GROUP BY slot_id
           ) per_slot"#,
    )
    .bind(workspace.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(max_active, 1);
}

#[tokio::test]
async fn task_lifecycle_updates_the_slot() {
    let Some(pool) = common::setup().await else { return };

    let moderator = Uuid::new_v4();
    let workspace = common::seed_workspace(&pool, moderator).await;
    let (_variant, _slots) = common::seed_variant_with_slots(&pool, workspace.id, "A", 1).await;

    let assignments = AssignmentService::new(pool.clone());
    let workspaces =
        recon_backend::services::workspace_service::WorkspaceService::new(pool.clone());

    let tasks = assignments
        .run_assignment(workspace.id, Some("t1"))
        .await
        .expect("run");
    let task = &tasks[0];

    // Skipping straight to done is rejected.
    let err = assignments
        .update_status(task.id, task.assigned_to, "done", false)
        .await
        .unwrap_err();
    assert!(matches!(err, recon_backend::error::Error::BadRequest(_)));

    let task_1 = assignments
        .update_status(task.id, task.assigned_to, "in_progress", false)
        .await
        .expect("start");
    assert_eq!(task_1.status, "in_progress");
    assert_eq!(
        workspaces.get_slot(task.slot_id).await.unwrap().status,
        "in_progress"
    );

    // A stranger cannot advance someone else's task.
    let err = assignments
        .update_status(task.id, Uuid::new_v4(), "submitted", false)
        .await
        .unwrap_err();
    assert!(matches!(err, recon_backend::error::Error::Forbidden(_)));

    assignments
        .update_status(task.id, task.assigned_to, "submitted", false)
        .await
        .expect("submit");
    let done = assignments
        .update_status(task.id, moderator, "done", true)
        .await
        .expect("close");
    assert_eq!(done.status, "done");
    assert!(done.completed_at.is_some());
    assert_eq!(
        workspaces.get_slot(task.slot_id).await.unwrap().status,
        "complete"
    );
}
