use crate::error::{Error, Result};
use crate::models::vote::{Vote, KIND_FREE_TEXT, KIND_MCQ};
use sqlx::PgPool;
use uuid::Uuid;

/// One active vote per (question, user, kind); re-voting replaces the
/// earlier answer in place.
#[derive(Clone)]
pub struct VoteService {
    pool: PgPool,
}

impl VoteService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, canonical_question_id: Uuid) -> Result<Vec<Vote>> {
        let votes = sqlx::query_as::<_, Vote>(
            r#"
            SELECT id, canonical_question_id, user_id, vote_kind, mcq_choice, free_text_answer,
                   created_at, updated_at
            FROM votes
            WHERE canonical_question_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(canonical_question_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(votes)
    }

    pub async fn upsert_mcq(
        &self,
        canonical_question_id: Uuid,
        user_id: Uuid,
        choice: i32,
    ) -> Result<Vote> {
        if choice < 0 {
            return Err(Error::BadRequest("Choice index cannot be negative".to_string()));
        }
        self.upsert(canonical_question_id, user_id, KIND_MCQ, Some(choice), None)
            .await
    }

    pub async fn upsert_free_text(
        &self,
        canonical_question_id: Uuid,
        user_id: Uuid,
        answer: &str,
    ) -> Result<Vote> {
        self.upsert(
            canonical_question_id,
            user_id,
            KIND_FREE_TEXT,
            None,
            Some(answer),
        )
        .await
    }

    async fn upsert(
        &self,
        canonical_question_id: Uuid,
        user_id: Uuid,
        kind: &str,
        mcq_choice: Option<i32>,
        free_text_answer: Option<&str>,
    ) -> Result<Vote> {
        let vote = sqlx::query_as::<_, Vote>(
            r#"
            INSERT INTO votes (canonical_question_id, user_id, vote_kind, mcq_choice, free_text_answer)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (canonical_question_id, user_id, vote_kind)
            DO UPDATE SET mcq_choice = EXCLUDED.mcq_choice,
                          free_text_answer = EXCLUDED.free_text_answer,
                          updated_at = NOW()
            RETURNING id, canonical_question_id, user_id, vote_kind, mcq_choice, free_text_answer,
                      created_at, updated_at
            "#,
        )
        .bind(canonical_question_id)
        .bind(user_id)
        .bind(kind)
        .bind(mcq_choice)
        .bind(free_text_answer)
        .fetch_one(&self.pool)
        .await?;

        Ok(vote)
    }
}
