use crate::{
    error::{AppError, Result},
    models::{
        message::{CreateMessageRequest, Message, UpdateMessageRequest},
        user::UserProfile,
    },
    services::database::{Database, PaginatedResult},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

/// 私信服务；所有读取都限定在会话参与者范围内
#[derive(Clone)]
pub struct MessageService {
    db: Arc<Database>,
}

impl MessageService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    /// 发送私信
    pub async fn send_message(
        &self,
        sender_id: &str,
        request: CreateMessageRequest,
    ) -> Result<Message> {
        debug!(
            "User {} sending message to {}",
            sender_id, request.receiver_id
        );

        request.validate().map_err(AppError::ValidatorError)?;

        if sender_id == request.receiver_id {
            return Err(AppError::bad_request("Cannot send a message to yourself"));
        }

        let receiver = self
            .db
            .get_by_id::<UserProfile>("user_profile", &request.receiver_id)
            .await?;
        if receiver.is_none() {
            return Err(AppError::not_found("Recipient not found"));
        }

        let message = Message::new(sender_id, &request.receiver_id, request.content);
        let created = self.db.create("message", &message).await?;

        info!(
            "User {} sent message {} to {}",
            sender_id, created.id, created.receiver_id
        );
        Ok(created)
    }

    /// 当前用户参与的私信，可选按对端过滤
    pub async fn list_messages(
        &self,
        user_id: &str,
        peer_id: Option<&str>,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<PaginatedResult<Message>> {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let (condition, params) = match peer_id {
            Some(peer) => (
                "((sender_id = $user_id AND receiver_id = $peer_id) \
                 OR (sender_id = $peer_id AND receiver_id = $user_id))",
                json!({
                    "user_id": user_id,
                    "peer_id": peer,
                    "limit": per_page,
                    "offset": offset
                }),
            ),
            None => (
                "(sender_id = $user_id OR receiver_id = $user_id)",
                json!({
                    "user_id": user_id,
                    "limit": per_page,
                    "offset": offset
                }),
            ),
        };

        let count_query = format!(
            "SELECT count() AS total FROM message WHERE {} GROUP ALL",
            condition
        );
        let mut count_response = self
            .db
            .query_with_params(&count_query, params.clone())
            .await?;
        let total_row: Option<Value> = count_response.take(0)?;
        let total = total_row
            .as_ref()
            .and_then(|v| v.get("total"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        let data_query = format!(
            "SELECT * FROM message WHERE {} ORDER BY created_at DESC LIMIT $limit START $offset",
            condition
        );
        let mut response = self.db.query_with_params(&data_query, params).await?;
        let messages: Vec<Message> = response.take(0)?;

        Ok(PaginatedResult::new(messages, total, page, per_page))
    }

    /// 读取单条私信，仅限参与者
    pub async fn get_message(&self, message_id: &str, user_id: &str) -> Result<Message> {
        let message = self
            .db
            .get_by_id::<Message>("message", message_id)
            .await?
            .ok_or_else(|| AppError::not_found("Message not found"))?;

        if !message.involves(user_id) {
            return Err(AppError::Authorization(
                "You are not a participant in this conversation".to_string(),
            ));
        }

        Ok(message)
    }

    /// 修改私信内容，仅限发送者
    pub async fn update_message(
        &self,
        message_id: &str,
        user_id: &str,
        request: UpdateMessageRequest,
    ) -> Result<Message> {
        request.validate().map_err(AppError::ValidatorError)?;

        let message = self.get_message(message_id, user_id).await?;
        if message.sender_id != user_id {
            return Err(AppError::Authorization(
                "Only the sender can update this message".to_string(),
            ));
        }

        let updated = self
            .db
            .update_by_id_with_json::<Message>(
                "message",
                message_id,
                json!({
                    "content": request.content,
                    "updated_at": chrono::Utc::now(),
                }),
            )
            .await?
            .ok_or_else(|| AppError::not_found("Message not found"))?;

        info!("Updated message: {}", message_id);
        Ok(updated)
    }

    /// 删除私信，仅限发送者
    pub async fn delete_message(&self, message_id: &str, user_id: &str) -> Result<()> {
        let message = self.get_message(message_id, user_id).await?;
        if message.sender_id != user_id {
            return Err(AppError::Authorization(
                "Only the sender can delete this message".to_string(),
            ));
        }

        self.db.delete_by_id("message", message_id).await?;

        info!("Deleted message: {}", message_id);
        Ok(())
    }
}
