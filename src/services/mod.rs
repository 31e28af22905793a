pub mod database;
pub mod auth;
pub mod user;
pub mod follow;
pub mod book;
pub mod shelf;
pub mod review;
pub mod summary;
pub mod post;
pub mod comment;
pub mod message;
pub mod storage;
pub mod ai;

// 重新导出常用类型
pub use database::Database;
pub use auth::AuthService;
pub use user::UserService;
pub use follow::FollowService;
pub use book::BookService;
pub use shelf::ShelfService;
pub use review::ReviewService;
pub use summary::SummaryService;
pub use post::PostService;
pub use comment::CommentService;
pub use message::MessageService;
pub use storage::StorageService;
pub use ai::AiService;
