use crate::error::{RenderError, Result};
use crate::image::{self, ImageInfo};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 已加载的模板图片
#[derive(Debug, Clone)]
pub struct Template {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub info: ImageInfo,
}

impl Template {
    pub fn width(&self) -> u32 {
        self.info.width
    }

    pub fn height(&self) -> u32 {
        self.info.height
    }

    pub fn mime_type(&self) -> &'static str {
        self.info.kind.mime_type()
    }
}

/// 模板目录
///
/// 模板引用只取文件名部分，目录成分一律丢弃，因此解析结果总在模板目录之内。
#[derive(Debug, Clone)]
pub struct TemplateStore {
    root: PathBuf,
}

impl TemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 模板引用对应的路径
    pub fn resolve_path(&self, template_ref: &str) -> Result<PathBuf> {
        let file_name = template_ref
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty() && *name != "." && *name != "..")
            .ok_or_else(|| RenderError::TemplateNotFound(template_ref.to_string()))?;

        Ok(self.root.join(file_name))
    }

    /// 模板是否存在
    pub async fn exists(&self, template_ref: &str) -> bool {
        match self.resolve_path(template_ref) {
            Ok(path) => tokio::fs::metadata(&path)
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// 读取模板并解析尺寸
    pub async fn load(&self, template_ref: &str) -> Result<Template> {
        let path = self.resolve_path(template_ref)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RenderError::TemplateNotFound(template_ref.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let info = image::probe(&bytes).ok_or_else(|| {
            RenderError::UnsupportedImage(format!("{} is not a PNG or JPEG image", path.display()))
        })?;

        debug!(
            template = %path.display(),
            width = info.width,
            height = info.height,
            "Template loaded"
        );

        Ok(Template { path, bytes, info })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::tests::png_header;

    #[test]
    fn test_resolve_strips_directories() {
        let store = TemplateStore::new("/srv/templates");

        assert_eq!(
            store.resolve_path("uploads/cert.png").unwrap(),
            PathBuf::from("/srv/templates/cert.png")
        );
        assert_eq!(
            store.resolve_path("../../etc/passwd").unwrap(),
            PathBuf::from("/srv/templates/passwd")
        );
        assert_eq!(
            store.resolve_path("C:\\temp\\cert.jpg").unwrap(),
            PathBuf::from("/srv/templates/cert.jpg")
        );
        assert!(store.resolve_path("templates/").is_err());
        assert!(store.resolve_path("..").is_err());
    }

    #[tokio::test]
    async fn test_load_template() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cert.png"), png_header(1000, 700)).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        let store = TemplateStore::new(dir.path());

        let template = store.load("cert.png").await.unwrap();
        assert_eq!(template.width(), 1000);
        assert_eq!(template.height(), 700);
        assert!(store.exists("some/dir/cert.png").await);

        let err = store.load("missing.png").await.unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound(_)));
        assert!(!store.exists("missing.png").await);

        let err = store.load("notes.txt").await.unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedImage(_)));
    }
}
