pub mod category;
pub mod comment;
pub mod post;
pub mod reaction;
pub mod subscriber;
pub mod user;

pub use category::*;
pub use comment::*;
pub use post::*;
pub use reaction::*;
pub use subscriber::*;
pub use user::*;
