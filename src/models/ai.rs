use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TranslateRequest {
    #[validate(length(min = 1, max = 10000))]
    pub text: String,
    /// 目标语言代码，缺省翻译成英文
    pub target_lang: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translated_text: String,
    pub target_lang: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct OcrRequest {
    #[validate(length(min = 1))]
    pub book_id: String,
    pub start_page: Option<u32>,
    pub end_page: Option<u32>,
    /// OCR 识别语言，缺省 "eng"
    pub language: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OcrResponse {
    pub text: String,
    pub pages_processed: u32,
}
