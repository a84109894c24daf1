use certflow_types::EventParticipation;
use std::path::{Path, PathBuf};

/// 文档输出目录
///
/// 文件名由证书 ID 与清洗后的参与者姓名确定，同一记录的输出路径稳定。
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(
        &self,
        participation: &EventParticipation,
        recipient_name: &str,
        extension: &str,
    ) -> PathBuf {
        self.root
            .join(participation.document_file_name(recipient_name, extension))
    }

    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    pub async fn write(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await
    }
}
