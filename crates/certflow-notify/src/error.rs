use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 投递失败分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryErrorKind {
    /// 凭据或配置缺失
    Configuration,
    /// 附件不存在
    AttachmentMissing,
    /// 收件地址被拒
    AddressRejected,
    /// 临时性传输错误
    Transient,
}

impl DeliveryErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryErrorKind::Configuration => "configuration",
            DeliveryErrorKind::AttachmentMissing => "attachment_missing",
            DeliveryErrorKind::AddressRejected => "address_rejected",
            DeliveryErrorKind::Transient => "transient",
        }
    }
}

/// 投递错误类型
#[derive(Error, Debug, Clone)]
pub enum DeliveryError {
    #[error("Missing email credentials: {0}")]
    MissingCredentials(String),

    #[error("Attachment not found: {0}")]
    AttachmentMissing(String),

    #[error("Recipient address rejected: {0}")]
    AddressRejected(String),

    #[error("Transient transport error: {0}")]
    Transient(String),

    /// 邮件构建失败
    #[error("Failed to build message: {0}")]
    Build(String),
}

pub type Result<T> = std::result::Result<T, DeliveryError>;

impl DeliveryError {
    pub fn kind(&self) -> DeliveryErrorKind {
        match self {
            DeliveryError::MissingCredentials(_) | DeliveryError::Build(_) => {
                DeliveryErrorKind::Configuration
            }
            DeliveryError::AttachmentMissing(_) => DeliveryErrorKind::AttachmentMissing,
            DeliveryError::AddressRejected(_) => DeliveryErrorKind::AddressRejected,
            DeliveryError::Transient(_) => DeliveryErrorKind::Transient,
        }
    }
}
