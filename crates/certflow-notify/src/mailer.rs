use crate::error::Result;
use crate::message::{DeliveryMetadata, MailRecipient};
use async_trait::async_trait;
use std::path::Path;

/// 投递协作方
///
/// 每次调用是一次独立的投递尝试，重试策略由调用方决定。
#[async_trait]
pub trait Mailer: Send + Sync {
    /// 检查凭据等配置是否齐全
    fn check_configured(&self) -> Result<()>;

    /// 发送带附件的邮件
    async fn send(
        &self,
        recipient: &MailRecipient,
        attachment_path: &Path,
        metadata: &DeliveryMetadata,
    ) -> Result<()>;

    /// 投递器名称
    fn name(&self) -> &str;
}
