//! Repository layer for database access.

mod comment;
mod follow;
mod group;
mod post;
mod user;
mod user_profile;

pub use comment::CommentRepository;
pub use follow::FollowRepository;
pub use group::GroupRepository;
pub use post::PostRepository;
pub use user::UserRepository;
pub use user_profile::UserProfileRepository;
