use crate::error::{Error, Result};
use crate::models::comment::Comment;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct CommentService {
    pool: PgPool,
}

impl CommentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creation order, for display; replies are limited to one level.
    pub async fn list(&self, canonical_question_id: Uuid) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, canonical_question_id, user_id, content, parent_id, is_deleted, created_at
            FROM comments
            WHERE canonical_question_id = $1 AND is_deleted = FALSE
            ORDER BY created_at ASC
            "#,
        )
        .bind(canonical_question_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    pub async fn add(
        &self,
        canonical_question_id: Uuid,
        user_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> Result<Comment> {
        if let Some(parent) = parent_id {
            let parent_row = sqlx::query_as::<_, Comment>(
                r#"SELECT id, canonical_question_id, user_id, content, parent_id, is_deleted, created_at
                   FROM comments WHERE id = $1"#,
            )
            .bind(parent)
            .fetch_one(&self.pool)
            .await?;

            if parent_row.canonical_question_id != canonical_question_id {
                return Err(Error::BadRequest(
                    "Parent comment belongs to a different question".to_string(),
                ));
            }
            if parent_row.parent_id.is_some() {
                return Err(Error::BadRequest(
                    "Replies to replies are not supported".to_string(),
                ));
            }
        }

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (canonical_question_id, user_id, content, parent_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, canonical_question_id, user_id, content, parent_id, is_deleted, created_at
            "#,
        )
        .bind(canonical_question_id)
        .bind(user_id)
        .bind(content)
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }
}
