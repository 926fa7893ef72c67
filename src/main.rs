use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};
use recon_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    // Change-feed delivery worker: drains the outbox one event at a time.
    if app_state.change_feed.enabled() {
        let state = app_state.clone();
        tokio::spawn(async move {
            loop {
                match state.change_feed.run_once().await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(Duration::from_millis(1000)).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "change feed worker error");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        });
    } else {
        info!("CHANGE_FEED_WEBHOOK_URL not set; change feed disabled");
    }

    // Staleness sweeper: reclaims abandoned tasks. Freed slots wait for the
    // next explicit assignment run; the sweeper never reassigns by itself.
    {
        let state = app_state.clone();
        tokio::spawn(async move {
            let stale_after = get_config().stale_task_hours;
            loop {
                match state.workspace_service.active_workspace_ids().await {
                    Ok(ids) => {
                        for workspace_id in ids {
                            match state
                                .assignment_service
                                .mark_stale_tasks(workspace_id, stale_after)
                                .await
                            {
                                Ok(0) => {}
                                Ok(count) => {
                                    info!(workspace = %workspace_id, count, "tasks marked stale")
                                }
                                Err(e) => {
                                    tracing::error!(error = ?e, workspace = %workspace_id, "stale sweep failed")
                                }
                            }
                        }
                    }
                    Err(e) => tracing::error!(error = ?e, "stale sweeper could not list workspaces"),
                }
                tokio::time::sleep(Duration::from_secs(600)).await;
            }
        });
    }

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let member_api = Router::new()
        .route("/api/workspaces", post(routes::workspace::create_workspace))
        .route(
            "/api/workspaces/:id/members",
            get(routes::workspace::list_members).post(routes::workspace::add_member),
        )
        .route(
            "/api/workspaces/:id/variants",
            get(routes::workspace::list_variants).post(routes::workspace::create_variant),
        )
        .route(
            "/api/variants/:id/slots",
            get(routes::workspace::list_slots_by_variant)
                .post(routes::workspace::bulk_create_slots),
        )
        .route("/api/slots/:id/open", post(routes::workspace::open_slot))
        .route("/api/slots/:id/link", post(routes::workspace::link_slot))
        .route(
            "/api/questions/:id",
            get(routes::question::get_canonical_question),
        )
        .route(
            "/api/questions/:id/resolve",
            get(routes::question::resolve_canonical_question),
        )
        .route(
            "/api/questions/:id/provenance",
            get(routes::question::list_provenance),
        )
        .route(
            "/api/questions/:id/similar",
            get(routes::question::find_similar_canonicals),
        )
        .route(
            "/api/questions/:id/draft",
            get(routes::draft::get_draft)
                .put(routes::draft::upsert_draft)
                .patch(routes::draft::update_draft_optimistic),
        )
        .route(
            "/api/questions/:id/comments",
            get(routes::question::list_comments).post(routes::question::add_comment),
        )
        .route(
            "/api/questions/:id/votes",
            get(routes::question::list_votes),
        )
        .route(
            "/api/questions/:id/votes/mcq",
            put(routes::question::upsert_mcq_vote),
        )
        .route(
            "/api/questions/:id/votes/free-text",
            put(routes::question::upsert_free_text_vote),
        )
        .route(
            "/api/workspaces/:id/presence",
            get(routes::workspace::list_presence).post(routes::workspace::upsert_presence),
        )
        .route(
            "/api/workspaces/:id/tasks",
            get(routes::assignment::list_tasks),
        )
        .route(
            "/api/tasks/:id/status",
            patch(routes::assignment::update_task_status),
        )
        .layer(axum::middleware::from_fn_with_state(
            recon_backend::middleware::rate_limit::RpsLimiter::new(config.api_rps),
            recon_backend::middleware::rate_limit::rps_middleware,
        ));

    let moderator_api = Router::new()
        .route(
            "/api/workspaces/:id/status",
            patch(routes::workspace::set_workspace_status),
        )
        .route(
            "/api/questions/merge",
            post(routes::question::merge_canonicals),
        )
        .route(
            "/api/questions/:id/split",
            post(routes::question::create_split_canonical),
        )
        .route(
            "/api/questions/split/move-slots",
            post(routes::question::split_move_slots),
        )
        .route(
            "/api/workspaces/:id/assignment/run",
            post(routes::assignment::run_assignment),
        )
        .route(
            "/api/workspaces/:id/assignment/mark-stale",
            post(routes::assignment::mark_stale_tasks),
        )
        .route(
            "/api/workspaces/:id/publish",
            post(routes::workspace::publish_workspace),
        )
        .layer(axum::middleware::from_fn_with_state(
            recon_backend::middleware::rate_limit::RpsLimiter::new(config.moderator_rps),
            recon_backend::middleware::rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(
            member_api
                .merge(moderator_api)
                .layer(axum::middleware::from_fn(
                    recon_backend::middleware::auth::require_bearer_auth,
                )),
        )
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
