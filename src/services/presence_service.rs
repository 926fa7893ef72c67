use crate::error::Result;
use crate::models::presence::{Presence, STATUS_EDITING, STATUS_VIEWING};
use sqlx::PgPool;
use uuid::Uuid;

/// Best-effort "who is looking at this right now" heartbeats. Nothing here
/// is authoritative: writes that fail are swallowed, and staleness is a
/// read-side filter. Presence never blocks or influences any other
/// operation.
#[derive(Clone)]
pub struct PresenceService {
    pool: PgPool,
}

impl PresenceService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records a heartbeat. Clients re-send roughly every 20 seconds; a
    /// failed or racing write is dropped silently.
    pub async fn upsert(
        &self,
        workspace_id: Uuid,
        canonical_question_id: Option<Uuid>,
        user_id: Uuid,
        status: &str,
    ) {
        let status = if status == STATUS_EDITING {
            STATUS_EDITING
        } else {
            STATUS_VIEWING
        };

        let result = sqlx::query(
            r#"
            INSERT INTO presence (workspace_id, canonical_question_id, user_id, status, last_heartbeat_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (workspace_id, user_id,
                         COALESCE(canonical_question_id, '00000000-0000-0000-0000-000000000000'::uuid))
            DO UPDATE SET status = EXCLUDED.status, last_heartbeat_at = NOW()
            "#,
        )
        .bind(workspace_id)
        .bind(canonical_question_id)
        .bind(user_id)
        .bind(status)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::debug!(error = ?e, "presence heartbeat dropped");
        }
    }

    /// Heartbeats younger than the TTL, scoped to one question or to the
    /// whole workspace. Expired rows are filtered out here, not deleted.
    pub async fn list(
        &self,
        workspace_id: Uuid,
        canonical_question_id: Option<Uuid>,
        ttl_seconds: i64,
    ) -> Result<Vec<Presence>> {
        let rows = sqlx::query_as::<_, Presence>(
            r#"
            SELECT workspace_id, canonical_question_id, user_id, status, last_heartbeat_at
            FROM presence
            WHERE workspace_id = $1
              AND ($2::uuid IS NULL OR canonical_question_id = $2)
              AND last_heartbeat_at > NOW() - make_interval(secs => $3)
            ORDER BY last_heartbeat_at DESC
            "#,
        )
        .bind(workspace_id)
        .bind(canonical_question_id)
        .bind(ttl_seconds as f64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
