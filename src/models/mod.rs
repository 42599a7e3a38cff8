pub mod common;
pub mod membership;
pub mod user;
pub mod organization;
pub mod community;
pub mod action;
pub mod user_action;
pub mod challenge;
pub mod post;
pub mod stats;

pub use membership::*;
pub use user::*;
pub use organization::*;
pub use community::*;
pub use action::*;
pub use user_action::*;
pub use challenge::*;
pub use post::*;
pub use stats::*;
