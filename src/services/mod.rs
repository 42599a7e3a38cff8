pub mod auth_service;
pub mod listing;
pub mod membership_service;
pub mod aggregations;
pub mod action_service;
pub mod user_action_service;
pub mod organization_service;
pub mod community_service;
pub mod post_service;
pub mod challenge_service;
pub mod user_service;
pub mod stats_service;
