use crate::{
    config::Config,
    services::{
        auth::AuthService,
        user::UserService,
        follow::FollowService,
        book::BookService,
        shelf::ShelfService,
        review::ReviewService,
        summary::SummaryService,
        post::PostService,
        comment::CommentService,
        message::MessageService,
        ai::AiService,
    },
};

/// 应用程序的共享状态
/// 包含所有服务和配置的引用
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Config,

    /// 认证服务
    pub auth_service: AuthService,

    /// 用户服务
    pub user_service: UserService,

    /// 关注服务
    pub follow_service: FollowService,

    /// 书籍服务
    pub book_service: BookService,

    /// 书架服务
    pub shelf_service: ShelfService,

    /// 书评服务
    pub review_service: ReviewService,

    /// 摘要服务
    pub summary_service: SummaryService,

    /// 动态服务
    pub post_service: PostService,

    /// 评论服务
    pub comment_service: CommentService,

    /// 私信服务
    pub message_service: MessageService,

    /// OCR 与翻译服务
    pub ai_service: AiService,
}

impl AppState {
    /// 检查是否为生产环境
    pub fn is_production(&self) -> bool {
        self.config.is_production()
    }
}
