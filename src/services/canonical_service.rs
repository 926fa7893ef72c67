use crate::error::{Error, Result};
use crate::models::canonical::{
    CanonicalQuestion, ProvenanceRecord, PROVENANCE_MERGE, PROVENANCE_SPLIT, PROVENANCE_SPLIT_MOVE,
};
use crate::models::slot::STATUS_AUTO_LINKED;
use serde_json::json;
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const SELECT_CANONICAL: &str = r#"SELECT id, workspace_id, question_type, created_by, created_at,
       retired_at, merged_into
FROM canonical_questions WHERE id = $1"#;

#[derive(Clone)]
pub struct CanonicalService {
    pool: PgPool,
}

impl CanonicalService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: Uuid) -> Result<CanonicalQuestion> {
        let question = sqlx::query_as::<_, CanonicalQuestion>(SELECT_CANONICAL)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(question)
    }

    /// Follows merge edges to the surviving record. A caller holding an id
    /// that now 404s uses this to find where the content went.
    pub async fn resolve(&self, id: Uuid) -> Result<CanonicalQuestion> {
        let mut current = self.get(id).await?;
        let mut hops = 0;
        while let Some(next) = current.merged_into {
            hops += 1;
            if hops > 16 {
                return Err(Error::Internal(format!(
                    "Merge chain too deep resolving canonical {}",
                    id
                )));
            }
            current = self.get(next).await?;
        }
        Ok(current)
    }

    /// Returns the canonical question behind a slot, creating and linking a
    /// fresh one if the slot has never been opened. Two members racing to
    /// open the same slot converge on the first writer's question.
    pub async fn open_slot(
        &self,
        slot_id: Uuid,
        actor: Uuid,
        question_type: &str,
    ) -> Result<CanonicalQuestion> {
        let slot = sqlx::query_as::<_, crate::models::slot::Slot>(
            r#"SELECT id, variant_id, workspace_id, slot_number, canonical_question_id,
                      status, created_at, updated_at
               FROM slots WHERE id = $1"#,
        )
        .bind(slot_id)
        .fetch_one(&self.pool)
        .await?;

        if let Some(existing) = slot.canonical_question_id {
            return self.get(existing).await;
        }

        let mut tx = self.pool.begin().await?;
        let question = sqlx::query_as::<_, CanonicalQuestion>(
            r#"
            INSERT INTO canonical_questions (workspace_id, question_type, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, workspace_id, question_type, created_by, created_at,
                      retired_at, merged_into
            "#,
        )
        .bind(slot.workspace_id)
        .bind(question_type)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;

        let linked = sqlx::query(
            r#"UPDATE slots SET canonical_question_id = $1, updated_at = NOW()
               WHERE id = $2 AND canonical_question_id IS NULL"#,
        )
        .bind(question.id)
        .bind(slot_id)
        .execute(&mut *tx)
        .await?;

        if linked.rows_affected() == 0 {
            // Lost the race; drop our question and return the winner's.
            drop(tx);
            let slot = sqlx::query_scalar::<_, Option<Uuid>>(
                r#"SELECT canonical_question_id FROM slots WHERE id = $1"#,
            )
            .bind(slot_id)
            .fetch_one(&self.pool)
            .await?;
            let winner = slot.ok_or_else(|| {
                Error::Internal("Slot link vanished during open".to_string())
            })?;
            return self.get(winner).await;
        }

        tx.commit().await?;
        Ok(question)
    }

    /// Points an unlinked slot at an existing canonical question — the same
    /// question recurring in another slot. The slot is marked auto_linked
    /// since no separate reconstruction work remains for it.
    pub async fn link_slot(&self, slot_id: Uuid, canonical_id: Uuid) -> Result<()> {
        let question = self.get(canonical_id).await?;
        if question.is_retired() {
            return Err(Error::NotFound(format!(
                "Canonical question {} was merged away",
                canonical_id
            )));
        }

        let updated = sqlx::query(
            r#"UPDATE slots SET canonical_question_id = $1, status = $2, updated_at = NOW()
               WHERE id = $3 AND workspace_id = $4 AND canonical_question_id IS NULL"#,
        )
        .bind(canonical_id)
        .bind(STATUS_AUTO_LINKED)
        .bind(slot_id)
        .bind(question.workspace_id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(Error::Conflict(
                "Slot is already linked or belongs to a different workspace".to_string(),
            ));
        }
        Ok(())
    }

    /// Consolidates two canonical questions believed identical. Every slot,
    /// comment and vote pointing at `from` is re-parented onto `to`, the
    /// draft is carried over (the `to` draft wins when both exist, with the
    /// losing content preserved in the provenance record), and `from` is
    /// retired. All of it happens in one transaction.
    pub async fn merge(
        &self,
        from: Uuid,
        to: Uuid,
        actor: Uuid,
        reason: Option<String>,
    ) -> Result<ProvenanceRecord> {
        if from == to {
            return Err(Error::BadRequest(
                "Cannot merge a question into itself".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        // Lock both rows in id order so two concurrent merges cannot deadlock.
        let (first, second) = if from < to { (from, to) } else { (to, from) };
        let first_row = lock_canonical(&mut tx, first).await?;
        let second_row = lock_canonical(&mut tx, second).await?;
        let (from_q, to_q) = if first == from {
            (first_row, second_row)
        } else {
            (second_row, first_row)
        };

        if from_q.is_retired() {
            return Err(Error::NotFound(format!(
                "Canonical question {} was already merged away",
                from
            )));
        }
        if to_q.is_retired() {
            return Err(Error::NotFound(format!(
                "Merge target {} was already merged away",
                to
            )));
        }
        if from_q.workspace_id != to_q.workspace_id {
            return Err(Error::BadRequest(
                "Cannot merge questions across workspaces".to_string(),
            ));
        }

        sqlx::query(
            r#"UPDATE slots SET canonical_question_id = $1, updated_at = NOW()
               WHERE canonical_question_id = $2"#,
        )
        .bind(to)
        .bind(from)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"UPDATE comments SET canonical_question_id = $1 WHERE canonical_question_id = $2"#,
        )
        .bind(to)
        .bind(from)
        .execute(&mut *tx)
        .await?;

        // A user may have voted on both sides; the vote already on the
        // surviving question wins.
        sqlx::query(
            r#"
            DELETE FROM votes v
            WHERE v.canonical_question_id = $2
              AND EXISTS (
                  SELECT 1 FROM votes w
                  WHERE w.canonical_question_id = $1
                    AND w.user_id = v.user_id
                    AND w.vote_kind = v.vote_kind
              )
            "#,
        )
        .bind(to)
        .bind(from)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"UPDATE votes SET canonical_question_id = $1 WHERE canonical_question_id = $2"#,
        )
        .bind(to)
        .bind(from)
        .execute(&mut *tx)
        .await?;

        let from_draft = sqlx::query_scalar::<_, JsonValue>(
            r#"SELECT content FROM drafts WHERE canonical_question_id = $1"#,
        )
        .bind(from)
        .fetch_optional(&mut *tx)
        .await?;

        let to_has_draft = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM drafts WHERE canonical_question_id = $1"#,
        )
        .bind(to)
        .fetch_one(&mut *tx)
        .await?
            > 0;

        let mut detail: Option<JsonValue> = None;
        if from_draft.is_some() {
            if to_has_draft {
                // The target draft wins; the losing content survives in the
                // provenance record for audit.
                detail = from_draft.map(|content| json!({ "superseded_draft": content }));
                sqlx::query(r#"DELETE FROM drafts WHERE canonical_question_id = $1"#)
                    .bind(from)
                    .execute(&mut *tx)
                    .await?;
            } else {
                sqlx::query(
                    r#"UPDATE drafts SET canonical_question_id = $1, updated_at = NOW()
                       WHERE canonical_question_id = $2"#,
                )
                .bind(to)
                .bind(from)
                .execute(&mut *tx)
                .await?;
            }
        }

        // Presence is advisory and safe to lose.
        sqlx::query(r#"DELETE FROM presence WHERE canonical_question_id = $1"#)
            .bind(from)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"UPDATE canonical_questions SET retired_at = NOW(), merged_into = $1 WHERE id = $2"#,
        )
        .bind(to)
        .bind(from)
        .execute(&mut *tx)
        .await?;

        let provenance = insert_provenance(
            &mut tx,
            from_q.workspace_id,
            PROVENANCE_MERGE,
            from,
            to,
            reason,
            detail,
            actor,
        )
        .await?;

        tx.commit().await?;
        Ok(provenance)
    }

    /// Allocates a fresh canonical question for slots that were wrongly
    /// linked; the actual slot moves follow via split_move_slots.
    pub async fn create_split(&self, from: Uuid, actor: Uuid) -> Result<CanonicalQuestion> {
        let source = self.get(from).await?;
        if source.is_retired() {
            return Err(Error::NotFound(format!(
                "Canonical question {} was merged away",
                from
            )));
        }

        let mut tx = self.pool.begin().await?;

        let question = sqlx::query_as::<_, CanonicalQuestion>(
            r#"
            INSERT INTO canonical_questions (workspace_id, question_type, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, workspace_id, question_type, created_by, created_at,
                      retired_at, merged_into
            "#,
        )
        .bind(source.workspace_id)
        .bind(&source.question_type)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;

        insert_provenance(
            &mut tx,
            source.workspace_id,
            PROVENANCE_SPLIT,
            from,
            question.id,
            None,
            None,
            actor,
        )
        .await?;

        tx.commit().await?;
        Ok(question)
    }

    /// Moves exactly the given slots from one canonical to another. Comments
    /// and votes stay where they are. Fails whole if any named slot is not
    /// currently linked to `from`.
    pub async fn split_move_slots(
        &self,
        from: Uuid,
        to: Uuid,
        slot_ids: &[Uuid],
        actor: Uuid,
        reason: Option<String>,
    ) -> Result<ProvenanceRecord> {
        if slot_ids.is_empty() {
            return Err(Error::BadRequest("No slots given to move".to_string()));
        }
        if from == to {
            return Err(Error::BadRequest(
                "Source and target question are the same".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let (first, second) = if from < to { (from, to) } else { (to, from) };
        let first_row = lock_canonical(&mut tx, first).await?;
        let second_row = lock_canonical(&mut tx, second).await?;
        let (from_q, to_q) = if first == from {
            (first_row, second_row)
        } else {
            (second_row, first_row)
        };

        if from_q.is_retired() || to_q.is_retired() {
            return Err(Error::NotFound(
                "Cannot move slots involving a merged-away question".to_string(),
            ));
        }
        if from_q.workspace_id != to_q.workspace_id {
            return Err(Error::BadRequest(
                "Cannot move slots across workspaces".to_string(),
            ));
        }

        let moved = sqlx::query(
            r#"UPDATE slots SET canonical_question_id = $1, updated_at = NOW()
               WHERE id = ANY($2) AND canonical_question_id = $3"#,
        )
        .bind(to)
        .bind(slot_ids)
        .bind(from)
        .execute(&mut *tx)
        .await?;

        if moved.rows_affected() != slot_ids.len() as u64 {
            return Err(Error::BadRequest(format!(
                "Expected to move {} slots but only {} were linked to the source question",
                slot_ids.len(),
                moved.rows_affected()
            )));
        }

        let provenance = insert_provenance(
            &mut tx,
            from_q.workspace_id,
            PROVENANCE_SPLIT_MOVE,
            from,
            to,
            reason,
            Some(json!({ "slot_ids": slot_ids })),
            actor,
        )
        .await?;

        tx.commit().await?;
        Ok(provenance)
    }

    pub async fn list_provenance(&self, question_id: Uuid) -> Result<Vec<ProvenanceRecord>> {
        let records = sqlx::query_as::<_, ProvenanceRecord>(
            r#"SELECT id, workspace_id, kind, from_id, to_id, reason, detail, created_by, created_at
               FROM canonical_provenance
               WHERE from_id = $1 OR to_id = $1
               ORDER BY created_at ASC"#,
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}

async fn lock_canonical(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<CanonicalQuestion> {
    let question = sqlx::query_as::<_, CanonicalQuestion>(
        r#"SELECT id, workspace_id, question_type, created_by, created_at,
                  retired_at, merged_into
           FROM canonical_questions WHERE id = $1 FOR UPDATE"#,
    )
    .bind(id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(question)
}

#[allow(clippy::too_many_arguments)]
async fn insert_provenance(
    tx: &mut Transaction<'_, Postgres>,
    workspace_id: Uuid,
    kind: &str,
    from: Uuid,
    to: Uuid,
    reason: Option<String>,
    detail: Option<JsonValue>,
    actor: Uuid,
) -> Result<ProvenanceRecord> {
    let record = sqlx::query_as::<_, ProvenanceRecord>(
        r#"
        INSERT INTO canonical_provenance (workspace_id, kind, from_id, to_id, reason, detail, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, workspace_id, kind, from_id, to_id, reason, detail, created_by, created_at
        "#,
    )
    .bind(workspace_id)
    .bind(kind)
    .bind(from)
    .bind(to)
    .bind(reason)
    .bind(detail)
    .bind(actor)
    .fetch_one(&mut **tx)
    .await?;
    Ok(record)
}
