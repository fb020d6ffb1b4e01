pub mod admin;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod posts;
pub mod subscribers;

pub use admin::admin_routes;
pub use auth::auth_routes;
pub use categories::categories_routes;
pub use comments::comments_routes;
pub use posts::posts_routes;
pub use subscribers::subscribers_routes;
