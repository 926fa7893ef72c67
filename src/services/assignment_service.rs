use crate::error::{Error, Result};
use crate::models::slot::{STATUS_COMPLETE, STATUS_IN_PROGRESS as SLOT_IN_PROGRESS};
use crate::models::task::{
    AssignmentTask, STATUS_ASSIGNED, STATUS_DONE, STATUS_IN_PROGRESS, STATUS_SUBMITTED,
};
use crate::utils::shuffle::{seed_to_u64, seeded_shuffle};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

const SELECT_TASK: &str = r#"SELECT id, workspace_id, slot_id, assigned_to, status,
       created_at, updated_at, completed_at
FROM assignment_tasks WHERE id = $1"#;

/// Distributes unfinished slots to workspace members as tasks and reclaims
/// abandoned ones. All fairness decisions happen in plan_assignments so the
/// same seed always reproduces the same plan.
#[derive(Clone)]
pub struct AssignmentService {
    pool: PgPool,
}

/// assigned -> in_progress -> submitted -> done; timeout-to-stale is handled
/// separately and stale leaves only via a fresh scheduling run.
fn valid_transition(from: &str, to: &str) -> bool {
    matches!(
        (from, to),
        (STATUS_ASSIGNED, STATUS_IN_PROGRESS)
            | (STATUS_IN_PROGRESS, STATUS_SUBMITTED)
            | (STATUS_SUBMITTED, STATUS_DONE)
    )
}

/// Hands each slot to the member with the fewest open tasks, ties broken by
/// the seeded member order. Slots and members are both shuffled by the seed
/// first, so the plan is reproducible and no member draws a second task
/// while another still has none.
fn plan_assignments(
    slot_ids: &[Uuid],
    members: &[Uuid],
    open_counts: &HashMap<Uuid, i64>,
    seed: u64,
) -> Vec<(Uuid, Uuid)> {
    if members.is_empty() || slot_ids.is_empty() {
        return Vec::new();
    }

    let mut slots = slot_ids.to_vec();
    seeded_shuffle(&mut slots, seed);
    let mut order = members.to_vec();
    seeded_shuffle(&mut order, seed.wrapping_add(1));

    let mut load: Vec<(Uuid, i64)> = order
        .iter()
        .map(|m| (*m, *open_counts.get(m).unwrap_or(&0)))
        .collect();

    let mut plan = Vec::with_capacity(slots.len());
    for slot in slots {
        let mut best = 0;
        for i in 1..load.len() {
            if load[i].1 < load[best].1 {
                best = i;
            }
        }
        plan.push((slot, load[best].0));
        load[best].1 += 1;
    }
    plan
}

impl AssignmentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a task for every slot that needs work: unassigned slots and
    /// in-progress slots whose task went stale. The partial unique index on
    /// assignment_tasks means a racing run can never double-book a slot.
    pub async fn run_assignment(
        &self,
        workspace_id: Uuid,
        seed: Option<&str>,
    ) -> Result<Vec<AssignmentTask>> {
        let members = sqlx::query_scalar::<_, Uuid>(
            r#"SELECT user_id FROM memberships WHERE workspace_id = $1 ORDER BY user_id ASC"#,
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        if members.is_empty() {
            return Err(Error::BadRequest(
                "Workspace has no members to assign work to".to_string(),
            ));
        }

        let counts: Vec<(Uuid, i64)> = sqlx::query_as(
            r#"
            SELECT assigned_to, COUNT(*) AS open
            FROM assignment_tasks
            WHERE workspace_id = $1 AND status IN ('assigned', 'in_progress', 'submitted')
            GROUP BY assigned_to
            "#,
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;
        let open_counts: HashMap<Uuid, i64> = counts.into_iter().collect();

        let slot_ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT s.id
            FROM slots s
            WHERE s.workspace_id = $1
              AND s.status IN ('unassigned', 'in_progress')
              AND NOT EXISTS (
                  SELECT 1 FROM assignment_tasks t
                  WHERE t.slot_id = s.id
                    AND t.status IN ('assigned', 'in_progress', 'submitted')
              )
            ORDER BY s.variant_id, s.slot_number
            "#,
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        let seed = match seed {
            Some(s) => seed_to_u64(s),
            None => seed_to_u64(&workspace_id.to_string()),
        };
        let plan = plan_assignments(&slot_ids, &members, &open_counts, seed);

        let mut created = Vec::with_capacity(plan.len());
        for (slot_id, member) in plan {
            let task = sqlx::query_as::<_, AssignmentTask>(
                r#"
                INSERT INTO assignment_tasks (workspace_id, slot_id, assigned_to, status)
                VALUES ($1, $2, $3, 'assigned')
                ON CONFLICT (slot_id) WHERE status IN ('assigned', 'in_progress', 'submitted')
                DO NOTHING
                RETURNING id, workspace_id, slot_id, assigned_to, status,
                          created_at, updated_at, completed_at
                "#,
            )
            .bind(workspace_id)
            .bind(slot_id)
            .bind(member)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(task) = task {
                created.push(task);
            }
        }

        tracing::info!(
            workspace = %workspace_id,
            created = created.len(),
            "assignment run finished"
        );
        Ok(created)
    }

    /// Moves every active task untouched for longer than the threshold to
    /// stale, freeing its slot for the next scheduling run. Returns the
    /// number of tasks transitioned.
    pub async fn mark_stale_tasks(&self, workspace_id: Uuid, stale_after_hours: i64) -> Result<u64> {
        if stale_after_hours < 1 {
            return Err(Error::BadRequest(
                "Staleness threshold must be at least one hour".to_string(),
            ));
        }

        let result = sqlx::query(
            r#"
            UPDATE assignment_tasks
            SET status = 'stale', updated_at = NOW()
            WHERE workspace_id = $1
              AND status IN ('assigned', 'in_progress', 'submitted')
              AND updated_at < NOW() - make_interval(hours => $2)
            "#,
        )
        .bind(workspace_id)
        .bind(stale_after_hours as i32)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Advances a task along assigned -> in_progress -> submitted -> done and
    /// keeps the slot status in step. Only the assignee may advance their
    /// task; moderators may additionally close a submitted task to done.
    pub async fn update_status(
        &self,
        task_id: Uuid,
        actor: Uuid,
        next_status: &str,
        actor_is_moderator: bool,
    ) -> Result<AssignmentTask> {
        let task = sqlx::query_as::<_, AssignmentTask>(SELECT_TASK)
            .bind(task_id)
            .fetch_one(&self.pool)
            .await?;

        let allowed = task.assigned_to == actor
            || (actor_is_moderator && next_status == STATUS_DONE);
        if !allowed {
            return Err(Error::Forbidden(
                "Only the assignee may advance this task".to_string(),
            ));
        }

        if !valid_transition(&task.status, next_status) {
            return Err(Error::BadRequest(format!(
                "Cannot move task from '{}' to '{}'",
                task.status, next_status
            )));
        }

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, AssignmentTask>(
            r#"
            UPDATE assignment_tasks
            SET status = $1,
                updated_at = NOW(),
                completed_at = CASE WHEN $1 = 'done' THEN NOW() ELSE completed_at END
            WHERE id = $2 AND status = $3
            RETURNING id, workspace_id, slot_id, assigned_to, status,
                      created_at, updated_at, completed_at
            "#,
        )
        .bind(next_status)
        .bind(task_id)
        .bind(&task.status)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            return Err(Error::Conflict(
                "Task status changed concurrently; reload and retry".to_string(),
            ));
        };

        let slot_status = match next_status {
            STATUS_IN_PROGRESS => Some(SLOT_IN_PROGRESS),
            STATUS_DONE => Some(STATUS_COMPLETE),
            _ => None,
        };
        if let Some(slot_status) = slot_status {
            sqlx::query(r#"UPDATE slots SET status = $1, updated_at = NOW() WHERE id = $2"#)
                .bind(slot_status)
                .bind(updated.slot_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn list_tasks(
        &self,
        workspace_id: Uuid,
        assigned_to: Option<Uuid>,
        status: Option<String>,
    ) -> Result<Vec<AssignmentTask>> {
        let tasks = sqlx::query_as::<_, AssignmentTask>(
            r#"
            SELECT id, workspace_id, slot_id, assigned_to, status,
                   created_at, updated_at, completed_at
            FROM assignment_tasks
            WHERE workspace_id = $1
              AND ($2::uuid IS NULL OR assigned_to = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at ASC
            "#,
        )
        .bind(workspace_id)
        .bind(assigned_to)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    pub async fn get_task(&self, task_id: Uuid) -> Result<AssignmentTask> {
        let task = sqlx::query_as::<_, AssignmentTask>(SELECT_TASK)
            .bind(task_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(task)
    }
}
