//! Business logic services.

pub mod comment;
pub mod follow;
pub mod forms;
pub mod group;
pub mod paginator;
pub mod post;
pub mod user;

pub use comment::{CommentService, CommentView};
pub use follow::{FollowOutcome, FollowService};
pub use forms::{
    CommentForm, FieldSpec, FormErrors, ImageUpload, LoginForm, PasswordChangeForm, PostForm,
    SignupForm, Submitted,
};
pub use group::{CreateGroupInput, GroupService};
pub use paginator::{POSTS_ON_PAGE, Page, PageWindow, Paginator};
pub use post::{EditOutcome, GroupPage, PostDetail, PostService, PostView, ProfilePage};
pub use user::{UserService, UserView};
