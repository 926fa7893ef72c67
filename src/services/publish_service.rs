use crate::error::{Error, Result};
use crate::models::bank_question::BankQuestion;
use crate::models::draft::DraftContent;
use crate::models::workspace::{STATUS_ACTIVE, STATUS_PUBLISHED};
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    pub published: usize,
    pub already_published: usize,
    pub skipped_incomplete: usize,
}

#[derive(FromRow)]
struct PublishableRow {
    id: Uuid,
    question_type: String,
    content: JsonValue,
}

/// A draft is complete enough to publish when both prompt and solution carry
/// text. Deliberately a simple, explicit predicate; stricter policies (all
/// slots linked, vote quorums) were considered and not adopted.
pub fn is_publishable(content: &DraftContent) -> bool {
    !content.prompt.trim().is_empty() && !content.solution.trim().is_empty()
}

/// One-way promotion of a workspace's finished questions into the permanent
/// bank. Each question lands in its own insert keyed by canonical id, so a
/// crash mid-run leaves individual questions fully published or not at all,
/// and a re-run never duplicates bank entries.
#[derive(Clone)]
pub struct PublishService {
    pool: PgPool,
}

impl PublishService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn publish_workspace(&self, workspace_id: Uuid) -> Result<PublishOutcome> {
        let status = sqlx::query_scalar::<_, String>(
            r#"SELECT status FROM workspaces WHERE id = $1"#,
        )
        .bind(workspace_id)
        .fetch_one(&self.pool)
        .await?;

        if status != STATUS_ACTIVE && status != STATUS_PUBLISHED {
            return Err(Error::BadRequest(format!(
                "Cannot publish a '{}' workspace",
                status
            )));
        }

        let rows = sqlx::query_as::<_, PublishableRow>(
            r#"
            SELECT cq.id AS id, cq.question_type AS question_type, d.content AS content
            FROM canonical_questions cq
            JOIN drafts d ON d.canonical_question_id = cq.id
            WHERE cq.workspace_id = $1 AND cq.retired_at IS NULL
            ORDER BY cq.created_at ASC
            "#,
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        let mut outcome = PublishOutcome {
            published: 0,
            already_published: 0,
            skipped_incomplete: 0,
        };

        for row in rows {
            let content: DraftContent = serde_json::from_value(row.content).unwrap_or_default();
            if !is_publishable(&content) {
                outcome.skipped_incomplete += 1;
                continue;
            }

            let inserted = sqlx::query_as::<_, BankQuestion>(
                r#"
                INSERT INTO bank_questions
                    (workspace_id, canonical_question_id, question_type, prompt, solution,
                     explanation, options, correct_choice, attachments)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (canonical_question_id) DO NOTHING
                RETURNING id, workspace_id, canonical_question_id, question_type, prompt,
                          solution, explanation, options, correct_choice, attachments,
                          published_at
                "#,
            )
            .bind(workspace_id)
            .bind(row.id)
            .bind(&row.question_type)
            .bind(content.prompt.trim())
            .bind(content.solution.trim())
            .bind(&content.explanation)
            .bind(serde_json::to_value(&content.options)?)
            .bind(content.correct_choice)
            .bind(serde_json::to_value(&content.attachments)?)
            .fetch_optional(&self.pool)
            .await?;

            if inserted.is_some() {
                outcome.published += 1;
            } else {
                outcome.already_published += 1;
            }
        }

        sqlx::query(
            r#"UPDATE workspaces SET status = $1, updated_at = NOW() WHERE id = $2"#,
        )
        .bind(STATUS_PUBLISHED)
        .bind(workspace_id)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            workspace = %workspace_id,
            published = outcome.published,
            already_published = outcome.already_published,
            skipped = outcome.skipped_incomplete,
            "workspace published"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(prompt: &str, solution: &str) -> DraftContent {
        DraftContent {
            prompt: prompt.to_string(),
            solution: solution.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn needs_prompt_and_solution() {
        assert!(is_publishable(&content("What is 2+2?", "4")));
        assert!(!is_publishable(&content("", "4")));
        assert!(!is_publishable(&content("What is 2+2?", "")));
        assert!(!is_publishable(&content("   ", "\t")));
    }
}
