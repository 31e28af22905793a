use crate::{
    error::{AppError, Result},
    models::ai::{OcrRequest, OcrResponse, TranslateRequest, TranslateResponse},
    state::AppState,
    utils::middleware::AuthUser,
};
use axum::{
    extract::State,
    response::Json,
    routing::post,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/translate", post(translate_text))
        .route("/ocr", post(ocr_book))
}

/// 文本翻译，转发给翻译服务
/// POST /api/ai/translate
pub async fn translate_text(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<Value>> {
    request.validate().map_err(AppError::ValidatorError)?;

    let target_lang = request.target_lang.unwrap_or_else(|| "en".to_string());
    debug!("User {} translating text to {}", user.id, target_lang);

    let translated_text = app_state
        .ai_service
        .translate(&request.text, &target_lang)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": TranslateResponse {
            translated_text,
            target_lang,
        }
    })))
}

/// 对书籍 PDF 的一段页码做 OCR
/// POST /api/ai/ocr
pub async fn ocr_book(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<OcrRequest>,
) -> Result<Json<Value>> {
    request.validate().map_err(AppError::ValidatorError)?;

    let start_page = request.start_page.unwrap_or(1);
    let end_page = request.end_page.unwrap_or(start_page);
    let language = request.language.unwrap_or_else(|| "eng".to_string());
    debug!(
        "User {} running OCR on book {} pages {}..={}",
        user.id, request.book_id, start_page, end_page
    );

    let pdf_bytes = app_state.book_service.read_pdf(&request.book_id).await?;
    let (text, pages_processed) = app_state
        .ai_service
        .ocr_pdf(&pdf_bytes, start_page, end_page, &language)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": OcrResponse {
            text,
            pages_processed,
        }
    })))
}
