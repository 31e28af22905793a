pub mod user;
pub mod follow;
pub mod book;
pub mod shelf;
pub mod summary;
pub mod review;
pub mod post;
pub mod comment;
pub mod message;
pub mod ai;
pub mod response;
