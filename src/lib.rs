pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    assignment_service::AssignmentService, canonical_service::CanonicalService,
    change_feed_service::ChangeFeedService, comment_service::CommentService,
    draft_service::DraftService, membership_service::MembershipService,
    presence_service::PresenceService, publish_service::PublishService,
    similarity_service::SimilarityService, vote_service::VoteService,
    workspace_service::WorkspaceService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub workspace_service: WorkspaceService,
    pub membership_service: MembershipService,
    pub canonical_service: CanonicalService,
    pub draft_service: DraftService,
    pub similarity_service: SimilarityService,
    pub assignment_service: AssignmentService,
    pub presence_service: PresenceService,
    pub comment_service: CommentService,
    pub vote_service: VoteService,
    pub publish_service: PublishService,
    pub change_feed: ChangeFeedService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();

        let workspace_service = WorkspaceService::new(pool.clone());
        let membership_service = MembershipService::new(pool.clone());
        let canonical_service = CanonicalService::new(pool.clone());
        let draft_service = DraftService::new(pool.clone());
        let similarity_service = SimilarityService::new(pool.clone());
        let assignment_service = AssignmentService::new(pool.clone());
        let presence_service = PresenceService::new(pool.clone());
        let comment_service = CommentService::new(pool.clone());
        let vote_service = VoteService::new(pool.clone());
        let publish_service = PublishService::new(pool.clone());
        let change_feed = ChangeFeedService::new(
            pool.clone(),
            config.change_feed_webhook_url.clone(),
            config.change_feed_secret.clone(),
        );

        Self {
            pool,
            workspace_service,
            membership_service,
            canonical_service,
            draft_service,
            similarity_service,
            assignment_service,
            presence_service,
            comment_service,
            vote_service,
            publish_service,
            change_feed,
        }
    }
}
