pub mod assignment_service;
pub mod canonical_service;
pub mod change_feed_service;
pub mod comment_service;
pub mod draft_service;
pub mod membership_service;
pub mod presence_service;
pub mod publish_service;
pub mod similarity_service;
pub mod vote_service;
pub mod workspace_service;
