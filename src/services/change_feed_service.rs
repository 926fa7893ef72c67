use crate::error::{Error, Result};
use crate::models::change_event::ChangeEvent;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use sha2::Sha256;
use sqlx::{PgPool, Row};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Outbound change-notification stream: row-level change events consuming
/// UIs subscribe to instead of polling. Events go through an outbox table
/// and a delivery worker; the engine never depends on the channel for
/// correctness, so recording is best-effort.
#[derive(Clone)]
pub struct ChangeFeedService {
    pool: PgPool,
    client: Client,
    target_url: Option<String>,
    secret: String,
}

impl ChangeFeedService {
    pub fn new(pool: PgPool, target_url: Option<String>, secret: String) -> Self {
        Self {
            pool,
            client: Client::new(),
            target_url,
            secret,
        }
    }

    pub fn enabled(&self) -> bool {
        self.target_url.is_some()
    }

    /// Queues one event. Failures are logged and swallowed: a broken feed
    /// must never fail the operation that produced the change.
    pub async fn record(
        &self,
        workspace_id: Uuid,
        canonical_question_id: Option<Uuid>,
        entity: &str,
        action: &str,
        payload: JsonValue,
    ) {
        let Some(target_url) = self.target_url.as_deref() else {
            return;
        };

        let result = sqlx::query(
            r#"
            INSERT INTO change_events
                (workspace_id, canonical_question_id, entity, action, payload, target_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(workspace_id)
        .bind(canonical_question_id)
        .bind(entity)
        .bind(action)
        .bind(&payload)
        .bind(target_url)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(error = ?e, entity, action, "change event dropped");
        }
    }

    /// Claims and delivers one pending event. Returns false when the outbox
    /// is empty so the worker loop can back off.
    pub async fn run_once(&self) -> Result<bool> {
        let claimed = sqlx::query(
            r#"
            UPDATE change_events SET status = 'delivering', updated_at = NOW()
            WHERE id = (
                SELECT id FROM change_events
                WHERE status = 'pending' AND (next_retry_at IS NULL OR next_retry_at <= NOW())
                ORDER BY created_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING id
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = claimed else { return Ok(false) };
        let id: Uuid = row.try_get("id")?;

        let _ = self.deliver_once(id).await;

        let row = sqlx::query(
            r#"SELECT attempts, max_attempts, status FROM change_events WHERE id = $1"#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        let attempts: i32 = row.try_get::<Option<i32>, _>("attempts")?.unwrap_or(0);
        let max_attempts: i32 = row.try_get::<Option<i32>, _>("max_attempts")?.unwrap_or(3);
        let status: String = row.try_get("status")?;

        if status == "failed" && attempts < max_attempts {
            sqlx::query(
                r#"UPDATE change_events
                   SET status = 'pending',
                       next_retry_at = NOW() + make_interval(secs => LEAST(3600, 30 * power(2::float, GREATEST(0, attempts-1))::int))
                   WHERE id = $1"#,
            )
            .bind(id)
            .execute(&self.pool)
            .await?;
        }

        Ok(true)
    }

    pub async fn deliver_once(&self, event_id: Uuid) -> Result<()> {
        let event = sqlx::query_as::<_, ChangeEvent>(
            r#"SELECT id, workspace_id, canonical_question_id, entity, action, payload, target_url,
                      http_status, response_body, attempts, max_attempts, next_retry_at, status,
                      created_at, updated_at
               FROM change_events WHERE id = $1"#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        let body = serde_json::to_vec(&json!({
            "id": event.id,
            "workspace_id": event.workspace_id,
            "canonical_question_id": event.canonical_question_id,
            "entity": event.entity,
            "action": event.action,
            "payload": event.payload,
            "created_at": event.created_at,
        }))?;
        let signature = self.sign(&body)?;

        let res = self
            .client
            .post(&event.target_url)
            .header("content-type", "application/json")
            .header("X-Recon-Signature", signature)
            .body(body)
            .send()
            .await;

        match res {
            Ok(resp) => {
                let status = resp.status().as_u16() as i32;
                let body = resp.text().await.unwrap_or_default();
                sqlx::query(
                    r#"UPDATE change_events
                       SET http_status = $1, response_body = $2,
                           status = CASE WHEN $1 BETWEEN 200 AND 299 THEN 'delivered' ELSE 'failed' END,
                           attempts = COALESCE(attempts, 0) + 1, updated_at = NOW()
                       WHERE id = $3"#,
                )
                .bind(status)
                .bind(body)
                .bind(event.id)
                .execute(&self.pool)
                .await?;
            }
            Err(err) => {
                sqlx::query(
                    r#"UPDATE change_events
                       SET response_body = $1, status = 'failed',
                           attempts = COALESCE(attempts, 0) + 1, updated_at = NOW()
                       WHERE id = $2"#,
                )
                .bind(format!("{}", err))
                .bind(event.id)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    fn sign(&self, body: &[u8]) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| Error::Internal(format!("Invalid change feed secret: {}", e)))?;
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}
