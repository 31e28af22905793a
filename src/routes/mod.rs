pub mod ai;
pub mod auth;
pub mod books;
pub mod comments;
pub mod messages;
pub mod posts;
pub mod reviews;
pub mod summaries;
pub mod users;
