use crate::{
    config::Config,
    error::{AppError, Result},
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 封面允许的扩展名
pub const COVER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
/// PDF 上传允许的扩展名
pub const PDF_EXTENSIONS: &[&str] = &["pdf"];
/// 摘要文件允许的扩展名
pub const SUMMARY_EXTENSIONS: &[&str] = &["pdf", "txt", "md", "doc", "docx"];

/// 已保存文件的信息
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// 相对 media_root 的路径，存入数据库
    pub relative_path: String,
    /// 原始文件名
    pub file_name: String,
}

/// 本地文件存储服务，管理上传文件的落盘与读取
#[derive(Clone)]
pub struct StorageService {
    media_root: PathBuf,
    max_upload_size: usize,
}

impl StorageService {
    pub async fn new(config: &Config) -> Result<Self> {
        let media_root = PathBuf::from(&config.media_root);
        for subdir in ["covers", "pdfs", "summaries"] {
            tokio::fs::create_dir_all(media_root.join(subdir)).await?;
        }
        info!("Media storage ready at {}", media_root.display());
        Ok(Self {
            media_root,
            max_upload_size: config.max_upload_size as usize,
        })
    }

    /// 保存上传内容，返回相对路径；文件名用 UUID 重写避免冲突
    pub async fn save(
        &self,
        subdir: &str,
        original_name: &str,
        allowed_extensions: &[&str],
        data: &[u8],
    ) -> Result<StoredFile> {
        if data.is_empty() {
            return Err(AppError::FileUpload("Uploaded file is empty".to_string()));
        }
        if data.len() > self.max_upload_size {
            return Err(AppError::FileUpload(format!(
                "File exceeds maximum size of {} bytes",
                self.max_upload_size
            )));
        }

        let extension = extension_of(original_name)
            .ok_or_else(|| AppError::FileUpload("File has no extension".to_string()))?;
        if !allowed_extensions.contains(&extension.as_str()) {
            warn!("Rejected upload with extension: {}", extension);
            return Err(AppError::FileUpload(format!(
                "File type .{} is not allowed",
                extension
            )));
        }

        let stored_name = format!("{}.{}", Uuid::new_v4(), extension);
        let relative_path = format!("{}/{}", subdir, stored_name);
        let full_path = self.media_root.join(&relative_path);

        tokio::fs::write(&full_path, data).await?;
        debug!("Stored {} bytes at {}", data.len(), relative_path);

        Ok(StoredFile {
            relative_path,
            file_name: original_name.to_string(),
        })
    }

    /// 打开已保存的文件用于流式下载，返回句柄与大小
    pub async fn open(&self, relative_path: &str) -> Result<(tokio::fs::File, u64)> {
        let full_path = self.resolve(relative_path)?;
        let file = tokio::fs::File::open(&full_path)
            .await
            .map_err(|_| AppError::not_found("File not found"))?;
        let size = file.metadata().await?.len();
        Ok((file, size))
    }

    /// 读取整个文件内容
    pub async fn read(&self, relative_path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(relative_path)?;
        tokio::fs::read(&full_path)
            .await
            .map_err(|_| AppError::not_found("File not found"))
    }

    /// 删除已保存的文件；文件缺失不视为错误
    pub async fn delete(&self, relative_path: &str) -> Result<()> {
        let full_path = self.resolve(relative_path)?;
        match tokio::fs::remove_file(&full_path).await {
            Ok(()) => {
                debug!("Deleted file {}", relative_path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    // 相对路径必须落在 media_root 之内
    fn resolve(&self, relative_path: &str) -> Result<PathBuf> {
        let candidate = Path::new(relative_path);
        if candidate.is_absolute()
            || candidate
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(AppError::bad_request("Invalid file path"));
        }
        Ok(self.media_root.join(candidate))
    }
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// 根据扩展名推断 Content-Type
pub fn content_type_for(path: &str) -> &'static str {
    match extension_of(path).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(root: &Path) -> Config {
        let mut config = Config::default_for_tests();
        config.media_root = root.to_string_lossy().to_string();
        config.max_upload_size = 1024;
        config
    }

    #[tokio::test]
    async fn test_save_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageService::new(&test_config(dir.path())).await.unwrap();

        let stored = storage
            .save("covers", "photo.PNG", COVER_EXTENSIONS, b"fake image")
            .await
            .unwrap();
        assert!(stored.relative_path.starts_with("covers/"));
        assert!(stored.relative_path.ends_with(".png"));
        assert_eq!(stored.file_name, "photo.PNG");

        let data = storage.read(&stored.relative_path).await.unwrap();
        assert_eq!(data, b"fake image");
    }

    #[tokio::test]
    async fn test_save_rejects_bad_extension() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageService::new(&test_config(dir.path())).await.unwrap();

        let err = storage
            .save("pdfs", "book.exe", PDF_EXTENSIONS, b"data")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FileUpload(_)));
    }

    #[tokio::test]
    async fn test_save_rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageService::new(&test_config(dir.path())).await.unwrap();

        let big = vec![0u8; 2048];
        let err = storage
            .save("covers", "big.png", COVER_EXTENSIONS, &big)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FileUpload(_)));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageService::new(&test_config(dir.path())).await.unwrap();

        let err = storage.read("../secrets.txt").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("covers/a.jpg"), "image/jpeg");
        assert_eq!(content_type_for("pdfs/b.pdf"), "application/pdf");
        assert_eq!(content_type_for("x.unknown"), "application/octet-stream");
    }
}
