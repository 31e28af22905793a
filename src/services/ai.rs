use crate::{
    config::Config,
    error::{AppError, Result},
    utils::validation,
};
use lopdf::Document;
use reqwest::{multipart, Client};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// 翻译与 OCR 的转发服务，自身不保存任何状态
#[derive(Clone)]
pub struct AiService {
    http_client: Client,
    config: Arc<Config>,
}

impl AiService {
    pub async fn new(config: Arc<Config>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// 把文本转发给翻译服务，返回译文
    pub async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        debug!("Translating {} chars to {}", text.len(), target_lang);

        let url = format!("{}/translate", self.config.translate_service_url);
        let response = self
            .http_client
            .post(&url)
            .json(&json!({
                "q": text,
                "source": "auto",
                "target": target_lang,
                "format": "text"
            }))
            .send()
            .await
            .map_err(|e| {
                warn!("Translation service unreachable: {}", e);
                AppError::ServiceUnavailable("Translation service is unavailable".to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Translation service returned {}: {}", status, body);
            return Err(AppError::ExternalService(format!(
                "Translation service returned {}",
                status
            )));
        }

        let payload: Value = response.json().await?;
        payload
            .get("translatedText")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::ExternalService(
                    "Translation service returned an unexpected response".to_string(),
                )
            })
    }

    /// 对 PDF 的指定页区间做 OCR，按页拆分后逐页转发，返回拼接文本与处理页数
    pub async fn ocr_pdf(
        &self,
        pdf_bytes: &[u8],
        start_page: u32,
        end_page: u32,
        language: &str,
    ) -> Result<(String, u32)> {
        validation::validate_page_range(start_page, end_page)?;

        let document = Document::load_mem(pdf_bytes)
            .map_err(|e| AppError::BadRequest(format!("Could not read the PDF file: {}", e)))?;
        let page_count = document.get_pages().len() as u32;
        if page_count == 0 {
            return Err(AppError::bad_request("The PDF file has no pages"));
        }
        if start_page > page_count {
            return Err(AppError::bad_request(
                "start_page is beyond the end of the document",
            ));
        }
        let end_page = end_page.min(page_count);

        debug!(
            "Running OCR on pages {}..={} of {} ({})",
            start_page, end_page, page_count, language
        );

        let mut text = String::new();
        for page in start_page..=end_page {
            let page_bytes = slice_single_page(&document, page, page_count)?;
            let page_text = self.ocr_single_page(page_bytes, language).await?;
            text.push_str(&page_text);
        }

        Ok((text, end_page - start_page + 1))
    }

    async fn ocr_single_page(&self, page_bytes: Vec<u8>, language: &str) -> Result<String> {
        let part = multipart::Part::bytes(page_bytes)
            .file_name("page.pdf")
            .mime_str("application/pdf")
            .map_err(|e| AppError::Internal(format!("Failed to build OCR request: {}", e)))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("language", language.to_string());

        let url = format!("{}/ocr", self.config.ocr_service_url);
        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!("OCR service unreachable: {}", e);
                AppError::ServiceUnavailable("OCR service is unavailable".to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("OCR service returned {}: {}", status, body);
            return Err(AppError::ExternalService(format!(
                "OCR service returned {}",
                status
            )));
        }

        let payload: Value = response.json().await?;
        payload
            .get("text")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::ExternalService(
                    "OCR service returned an unexpected response".to_string(),
                )
            })
    }
}

// 保留目标页，删掉其余页，得到单页文档
fn slice_single_page(document: &Document, page: u32, page_count: u32) -> Result<Vec<u8>> {
    let mut single = document.clone();
    let delete: Vec<u32> = (1..=page_count).filter(|p| *p != page).collect();
    if !delete.is_empty() {
        single.delete_pages(&delete);
    }
    single.prune_objects();

    let mut buffer = Vec::new();
    single
        .save_to(&mut buffer)
        .map_err(|e| AppError::Internal(format!("Failed to serialize PDF page: {}", e)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;
    use lopdf::{Object, Stream};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn service_for(base_url: &str) -> AiService {
        let mut config = Config::default_for_tests();
        config.translate_service_url = base_url.to_string();
        config.ocr_service_url = base_url.to_string();
        AiService::new(Arc::new(config)).await.unwrap()
    }

    // 纯 lopdf 构造的最小多页文档
    fn build_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::new();
        for _ in 0..pages {
            let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let kids_len = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => kids_len,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_slice_single_page_keeps_one_page() {
        let bytes = build_pdf(3);
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 3);

        let sliced = slice_single_page(&doc, 2, 3).unwrap();
        let sliced_doc = Document::load_mem(&sliced).unwrap();
        assert_eq!(sliced_doc.get_pages().len(), 1);
    }

    #[test]
    fn test_slice_single_page_on_single_page_doc() {
        let bytes = build_pdf(1);
        let doc = Document::load_mem(&bytes).unwrap();

        let sliced = slice_single_page(&doc, 1, 1).unwrap();
        let sliced_doc = Document::load_mem(&sliced).unwrap();
        assert_eq!(sliced_doc.get_pages().len(), 1);
    }

    #[tokio::test]
    async fn test_translate_returns_service_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"translatedText": "hola"})),
            )
            .mount(&server)
            .await;

        let service = service_for(&server.uri()).await;
        let translated = service.translate("hello", "es").await.unwrap();
        assert_eq!(translated, "hola");
    }

    #[tokio::test]
    async fn test_translate_surfaces_upstream_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let service = service_for(&server.uri()).await;
        let err = service.translate("hello", "es").await.unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));
    }

    #[tokio::test]
    async fn test_translate_rejects_malformed_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"detail": "nope"})))
            .mount(&server)
            .await;

        let service = service_for(&server.uri()).await;
        let err = service.translate("hello", "es").await.unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));
    }

    #[tokio::test]
    async fn test_ocr_pdf_concatenates_page_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ocr"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "line "})))
            .mount(&server)
            .await;

        let service = service_for(&server.uri()).await;
        let pdf = build_pdf(3);
        let (text, pages_processed) = service.ocr_pdf(&pdf, 1, 2, "eng").await.unwrap();
        assert_eq!(pages_processed, 2);
        assert_eq!(text, "line line ");
    }

    #[tokio::test]
    async fn test_ocr_pdf_clamps_end_page_to_document() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ocr"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "x"})))
            .mount(&server)
            .await;

        let service = service_for(&server.uri()).await;
        let pdf = build_pdf(2);
        let (_, pages_processed) = service.ocr_pdf(&pdf, 1, 50, "eng").await.unwrap();
        assert_eq!(pages_processed, 2);
    }

    #[tokio::test]
    async fn test_ocr_pdf_rejects_start_beyond_document() {
        let server = MockServer::start().await;
        let service = service_for(&server.uri()).await;

        let pdf = build_pdf(1);
        let err = service.ocr_pdf(&pdf, 5, 6, "eng").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_ocr_pdf_rejects_garbage_bytes() {
        let server = MockServer::start().await;
        let service = service_for(&server.uri()).await;

        let err = service.ocr_pdf(b"not a pdf", 1, 1, "eng").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
