use crate::dto::workspace_dto::{CreateVariantPayload, CreateWorkspacePayload};
use crate::error::{Error, Result};
use crate::models::membership::ROLE_MODERATOR;
use crate::models::slot::Slot;
use crate::models::variant::Variant;
use crate::models::workspace::{
    Workspace, STATUS_ACTIVE, STATUS_ARCHIVED, STATUS_DRAFT, STATUS_PUBLISHED,
};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct WorkspaceService {
    pool: PgPool,
}

/// `published` is reachable only through the publisher, never through a
/// direct status change.
fn allowed_status_change(from: &str, to: &str) -> bool {
    matches!(
        (from, to),
        (STATUS_DRAFT, STATUS_ACTIVE)
            | (STATUS_ACTIVE, STATUS_DRAFT)
            | (STATUS_DRAFT, STATUS_ARCHIVED)
            | (STATUS_ACTIVE, STATUS_ARCHIVED)
            | (STATUS_PUBLISHED, STATUS_ARCHIVED)
    )
}

impl WorkspaceService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the workspace and enrolls the creator as its first moderator
    /// in one transaction.
    pub async fn create(&self, payload: CreateWorkspacePayload, creator: Uuid) -> Result<Workspace> {
        let mut tx = self.pool.begin().await?;

        let workspace = sqlx::query_as::<_, Workspace>(
            r#"
            INSERT INTO workspaces (title, subject, term, due_at, dataset_ref, status, created_by)
            VALUES ($1, $2, $3, $4, $5, 'draft', $6)
            RETURNING id, title, subject, term, due_at, dataset_ref, status, created_by,
                      created_at, updated_at
            "#,
        )
        .bind(&payload.title)
        .bind(&payload.subject)
        .bind(&payload.term)
        .bind(payload.due_at)
        .bind(&payload.dataset_ref)
        .bind(creator)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"INSERT INTO memberships (workspace_id, user_id, role) VALUES ($1, $2, $3)"#,
        )
        .bind(workspace.id)
        .bind(creator)
        .bind(ROLE_MODERATOR)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(workspace)
    }

    pub async fn get(&self, id: Uuid) -> Result<Workspace> {
        let workspace = sqlx::query_as::<_, Workspace>(
            r#"SELECT id, title, subject, term, due_at, dataset_ref, status, created_by,
                      created_at, updated_at
               FROM workspaces WHERE id = $1"#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(workspace)
    }

    pub async fn set_status(&self, id: Uuid, status: &str) -> Result<Workspace> {
        let workspace = self.get(id).await?;

        if status == STATUS_PUBLISHED {
            return Err(Error::BadRequest(
                "Workspaces become published through the publish operation".to_string(),
            ));
        }
        if !allowed_status_change(&workspace.status, status) {
            return Err(Error::BadRequest(format!(
                "Cannot change workspace status from '{}' to '{}'",
                workspace.status, status
            )));
        }

        let updated = sqlx::query_as::<_, Workspace>(
            r#"
            UPDATE workspaces SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, subject, term, due_at, dataset_ref, status, created_by,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    pub async fn create_variant(
        &self,
        workspace_id: Uuid,
        payload: CreateVariantPayload,
    ) -> Result<Variant> {
        let workspace = self.get(workspace_id).await?;
        if workspace.status == STATUS_PUBLISHED || workspace.status == STATUS_ARCHIVED {
            return Err(Error::BadRequest(format!(
                "Cannot add variants to a '{}' workspace",
                workspace.status
            )));
        }

        let variant = sqlx::query_as::<_, Variant>(
            r#"
            INSERT INTO variants (workspace_id, code, question_count)
            VALUES ($1, $2, $3)
            RETURNING id, workspace_id, code, question_count, created_at
            "#,
        )
        .bind(workspace_id)
        .bind(&payload.code)
        .bind(payload.question_count)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.constraint().is_some() => {
                Error::Conflict(format!("Variant '{}' already exists", payload.code))
            }
            other => other.into(),
        })?;

        Ok(variant)
    }

    pub async fn list_variants(&self, workspace_id: Uuid) -> Result<Vec<Variant>> {
        let variants = sqlx::query_as::<_, Variant>(
            r#"SELECT id, workspace_id, code, question_count, created_at
               FROM variants WHERE workspace_id = $1 ORDER BY code ASC"#,
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(variants)
    }

    pub async fn get_variant(&self, variant_id: Uuid) -> Result<Variant> {
        let variant = sqlx::query_as::<_, Variant>(
            r#"SELECT id, workspace_id, code, question_count, created_at
               FROM variants WHERE id = $1"#,
        )
        .bind(variant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(variant)
    }

    /// Creates slots numbered 1..=count, all unassigned. A variant's slot
    /// layout is laid down once; corrections go through a fresh variant.
    pub async fn bulk_create_slots(&self, variant_id: Uuid, count: i32) -> Result<Vec<Slot>> {
        if count < 1 {
            return Err(Error::BadRequest("Slot count must be at least 1".to_string()));
        }

        let variant = self.get_variant(variant_id).await?;

        let existing = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM slots WHERE variant_id = $1"#,
        )
        .bind(variant_id)
        .fetch_one(&self.pool)
        .await?;
        if existing > 0 {
            return Err(Error::Conflict(format!(
                "Variant '{}' already has slots",
                variant.code
            )));
        }

        let slots = sqlx::query_as::<_, Slot>(
            r#"
            INSERT INTO slots (variant_id, workspace_id, slot_number, status)
            SELECT $1, $2, n, $4 FROM generate_series(1, $3) AS n
            RETURNING id, variant_id, workspace_id, slot_number, canonical_question_id,
                      status, created_at, updated_at
            "#,
        )
        .bind(variant_id)
        .bind(variant.workspace_id)
        .bind(count)
        .bind(crate::models::slot::STATUS_UNASSIGNED)
        .fetch_all(&self.pool)
        .await?;

        Ok(slots)
    }

    pub async fn list_slots_by_variant(&self, variant_id: Uuid) -> Result<Vec<Slot>> {
        let slots = sqlx::query_as::<_, Slot>(
            r#"SELECT id, variant_id, workspace_id, slot_number, canonical_question_id,
                      status, created_at, updated_at
               FROM slots WHERE variant_id = $1 ORDER BY slot_number ASC"#,
        )
        .bind(variant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(slots)
    }

    pub async fn get_slot(&self, slot_id: Uuid) -> Result<Slot> {
        let slot = sqlx::query_as::<_, Slot>(
            r#"SELECT id, variant_id, workspace_id, slot_number, canonical_question_id,
                      status, created_at, updated_at
               FROM slots WHERE id = $1"#,
        )
        .bind(slot_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(slot)
    }

    /// Workspaces the stale-task sweeper should visit.
    pub async fn active_workspace_ids(&self) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"SELECT id FROM workspaces WHERE status = 'active'"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn published_is_terminal_except_archive() {
        assert!(allowed_status_change(STATUS_PUBLISHED, STATUS_ARCHIVED));
        assert!(!allowed_status_change(STATUS_PUBLISHED, STATUS_ACTIVE));
        assert!(!allowed_status_change(STATUS_PUBLISHED, STATUS_DRAFT));
    }

    #[test]
    fn draft_and_active_flow() {
        assert!(allowed_status_change(STATUS_DRAFT, STATUS_ACTIVE));
        assert!(allowed_status_change(STATUS_ACTIVE, STATUS_DRAFT));
        assert!(allowed_status_change(STATUS_DRAFT, STATUS_ARCHIVED));
        assert!(allowed_status_change(STATUS_ACTIVE, STATUS_ARCHIVED));
        assert!(!allowed_status_change(STATUS_ARCHIVED, STATUS_ACTIVE));
        assert!(!allowed_status_change(STATUS_DRAFT, STATUS_PUBLISHED));
    }
}
