use crate::error::{Error, Result};
use crate::models::draft::{Draft, DraftContent};
use sqlx::PgPool;
use uuid::Uuid;

const SELECT_DRAFT: &str = r#"SELECT canonical_question_id, content, revision, last_edited_by,
       created_at, updated_at
FROM drafts WHERE canonical_question_id = $1"#;

/// Mediates all reads and writes of the one free-form document attached to a
/// canonical question. Concurrent edits reconcile at whole-document
/// granularity: the writer must present the revision it last observed, and a
/// mismatch is a routine conflict, never an auto-merge.
#[derive(Clone)]
pub struct DraftService {
    pool: PgPool,
}

impl DraftService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, canonical_id: Uuid) -> Result<Draft> {
        let draft = sqlx::query_as::<_, Draft>(SELECT_DRAFT)
            .bind(canonical_id)
            .fetch_optional(&self.pool)
            .await?;
        draft.ok_or_else(|| Error::NotFound("No draft yet for this question".to_string()))
    }

    /// First-ever save. The draft starts at revision 1; if one already
    /// exists the caller must go through the optimistic path instead.
    pub async fn upsert(
        &self,
        canonical_id: Uuid,
        editor: Uuid,
        content: DraftContent,
    ) -> Result<Draft> {
        let content = serde_json::to_value(content)?;
        let draft = sqlx::query_as::<_, Draft>(
            r#"
            INSERT INTO drafts (canonical_question_id, content, revision, last_edited_by)
            VALUES ($1, $2, 1, $3)
            ON CONFLICT (canonical_question_id) DO NOTHING
            RETURNING canonical_question_id, content, revision, last_edited_by,
                      created_at, updated_at
            "#,
        )
        .bind(canonical_id)
        .bind(&content)
        .bind(editor)
        .fetch_optional(&self.pool)
        .await?;

        match draft {
            Some(draft) => Ok(draft),
            None => {
                let current = self.get(canonical_id).await?;
                Err(Error::Conflict(format!(
                    "Draft already exists at revision {}; use the optimistic update",
                    current.revision
                )))
            }
        }
    }

    /// Succeeds iff the stored revision still equals `prev_revision` at
    /// write time. One conditional UPDATE, never read-then-write: the lost
    /// update window does not exist.
    pub async fn update_optimistic(
        &self,
        canonical_id: Uuid,
        editor: Uuid,
        prev_revision: i32,
        content: DraftContent,
    ) -> Result<Draft> {
        let content = serde_json::to_value(content)?;
        let updated = sqlx::query_as::<_, Draft>(
            r#"
            UPDATE drafts
            SET content = $1, revision = revision + 1, last_edited_by = $2, updated_at = NOW()
            WHERE canonical_question_id = $3 AND revision = $4
            RETURNING canonical_question_id, content, revision, last_edited_by,
                      created_at, updated_at
            "#,
        )
        .bind(&content)
        .bind(editor)
        .bind(canonical_id)
        .bind(prev_revision)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(draft) => Ok(draft),
            None => {
                // Zero rows hit: either the draft does not exist, or someone
                // else committed first. Tell the caller which.
                let current = self.get(canonical_id).await?;
                Err(Error::Conflict(format!(
                    "Draft changed since revision {}; current revision is {}. Reload and retry.",
                    prev_revision, current.revision
                )))
            }
        }
    }
}
