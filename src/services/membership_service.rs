use crate::error::{Error, Result};
use crate::models::membership::{Membership, ROLE_CONTRIBUTOR, ROLE_MODERATOR};
use sqlx::PgPool;
use uuid::Uuid;

/// Workspace role checks. Identity comes from the external gate (JWT); the
/// workspace role is authoritative here, at the storage boundary.
#[derive(Clone)]
pub struct MembershipService {
    pool: PgPool,
}

impl MembershipService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn require_member(&self, workspace_id: Uuid, user_id: Uuid) -> Result<Membership> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"SELECT workspace_id, user_id, role, created_at
               FROM memberships WHERE workspace_id = $1 AND user_id = $2"#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        membership.ok_or_else(|| Error::Forbidden("Not a member of this workspace".to_string()))
    }

    pub async fn require_moderator(&self, workspace_id: Uuid, user_id: Uuid) -> Result<Membership> {
        let membership = self.require_member(workspace_id, user_id).await?;
        if membership.role != ROLE_MODERATOR {
            return Err(Error::Forbidden(
                "This operation requires a moderator role".to_string(),
            ));
        }
        Ok(membership)
    }

    pub async fn add_member(
        &self,
        workspace_id: Uuid,
        actor: Uuid,
        user_id: Uuid,
        role: &str,
    ) -> Result<Membership> {
        self.require_moderator(workspace_id, actor).await?;

        if role != ROLE_MODERATOR && role != ROLE_CONTRIBUTOR {
            return Err(Error::BadRequest(format!("Unknown role: {}", role)));
        }

        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO memberships (workspace_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (workspace_id, user_id) DO UPDATE SET role = EXCLUDED.role
            RETURNING workspace_id, user_id, role, created_at
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok(membership)
    }

    pub async fn list_members(&self, workspace_id: Uuid, actor: Uuid) -> Result<Vec<Membership>> {
        self.require_member(workspace_id, actor).await?;

        let members = sqlx::query_as::<_, Membership>(
            r#"SELECT workspace_id, user_id, role, created_at
               FROM memberships WHERE workspace_id = $1 ORDER BY created_at ASC"#,
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }
}
