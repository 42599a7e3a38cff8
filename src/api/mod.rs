pub mod health;
pub mod auth;
pub mod users;
pub mod actions;
pub mod user_actions;
pub mod organizations;
pub mod communities;
pub mod posts;
pub mod challenges;
pub mod swagger;
