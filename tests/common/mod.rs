#![allow(dead_code)]

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use recon_backend::dto::workspace_dto::{CreateVariantPayload, CreateWorkspacePayload};
use recon_backend::middleware::auth::Claims;
use recon_backend::models::variant::Variant;
use recon_backend::models::workspace::Workspace;
use sqlx::PgPool;
use std::env;
use uuid::Uuid;

const JWT_SECRET: &str = "test_secret_key";

/// Connects to the test database, or returns None (skipping the suite) when
/// DATABASE_URL is not configured.
pub async fn setup() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    if env::var("DATABASE_URL").is_err() {
        eprintln!("skipping: DATABASE_URL not set");
        return None;
    }

    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("JWT_SECRET", JWT_SECRET);
    env::set_var("API_RPS", "1000");
    env::set_var("MODERATOR_RPS", "1000");
    env::set_var("STALE_TASK_HOURS", "24");
    env::set_var("PRESENCE_TTL_SECONDS", "60");
    env::set_var("CHANGE_FEED_SECRET", "whsec_test");

    // Several tests share one process; only the first init matters.
    let _ = recon_backend::config::init_config();

    let pool = recon_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
    Some(pool)
}

pub fn token(user: Uuid) -> String {
    let claims = Claims {
        sub: user.to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("token")
}

pub async fn seed_workspace(pool: &PgPool, creator: Uuid) -> Workspace {
    let service = recon_backend::services::workspace_service::WorkspaceService::new(pool.clone());
    let workspace = service
        .create(
            CreateWorkspacePayload {
                title: "Algorithms Final".into(),
                subject: "CS".into(),
                term: "2026-1".into(),
                due_at: None,
                dataset_ref: None,
            },
            creator,
        )
        .await
        .expect("workspace");
    service
        .set_status(workspace.id, "active")
        .await
        .expect("activate workspace")
}

pub async fn seed_variant_with_slots(
    pool: &PgPool,
    workspace_id: Uuid,
    code: &str,
    count: i32,
) -> (Variant, Vec<recon_backend::models::slot::Slot>) {
    let service = recon_backend::services::workspace_service::WorkspaceService::new(pool.clone());
    let variant = service
        .create_variant(
            workspace_id,
            CreateVariantPayload {
                code: code.into(),
                question_count: count,
            },
        )
        .await
        .expect("variant");
    let slots = service
        .bulk_create_slots(variant.id, count)
        .await
        .expect("slots");
    (variant, slots)
}

pub async fn add_contributor(pool: &PgPool, workspace_id: Uuid, moderator: Uuid) -> Uuid {
    let service = recon_backend::services::membership_service::MembershipService::new(pool.clone());
    let user = Uuid::new_v4();
    service
        .add_member(workspace_id, moderator, user, "contributor")
        .await
        .expect("member");
    user
}
