use certflow_types::escape_html;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 收件人
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailRecipient {
    pub name: String,
    pub email: String,
    pub certificate_id: String,
}

/// 邮件中使用的活动信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryMetadata {
    pub event_name: String,
    pub organization_name: String,
    pub event_date: String,
}

const DEFAULT_BODY: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #333333;">
  <p>Dear {{name}},</p>
  <p>Thank you for participating in <strong>{{event}}</strong>, organized by {{organization}} on {{date}}.</p>
  <p>Please find your certificate attached to this email.</p>
  <p>Best regards,<br>{{organization}}</p>
</body>
</html>
"#;

/// 邮件正文模板
///
/// 支持 `{{name}}` `{{event}}` `{{organization}}` `{{date}}` 四个占位符，替换值会做 HTML 转义。
#[derive(Debug, Clone)]
pub struct EmailTemplate {
    body: String,
}

impl EmailTemplate {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self::new(std::fs::read_to_string(path)?))
    }

    pub fn subject(metadata: &DeliveryMetadata) -> String {
        format!("Certificate for {}", metadata.event_name)
    }

    pub fn render(&self, recipient: &MailRecipient, metadata: &DeliveryMetadata) -> String {
        self.body
            .replace("{{name}}", &escape_html(&recipient.name))
            .replace("{{event}}", &escape_html(&metadata.event_name))
            .replace("{{organization}}", &escape_html(&metadata.organization_name))
            .replace("{{date}}", &escape_html(&metadata.event_date))
    }
}

impl Default for EmailTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_BODY)
    }
}

/// 附件文件名
pub fn attachment_name(certificate_id: &str, extension: &str) -> String {
    format!("Certificate_{}.{}", certificate_id, extension)
}

/// 按扩展名推断附件 MIME 类型
pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "html" | "htm" => "text/html",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient() -> MailRecipient {
        MailRecipient {
            name: "Alice <3".to_string(),
            email: "alice@example.com".to_string(),
            certificate_id: "CERT-abc".to_string(),
        }
    }

    fn metadata() -> DeliveryMetadata {
        DeliveryMetadata {
            event_name: "Rust Workshop".to_string(),
            organization_name: "Yukti Yantra".to_string(),
            event_date: "March 3, 2026".to_string(),
        }
    }

    #[test]
    fn test_render_default_template() {
        let body = EmailTemplate::default().render(&recipient(), &metadata());

        assert!(body.contains("Dear Alice &lt;3,"));
        assert!(body.contains("<strong>Rust Workshop</strong>"));
        assert!(body.contains("on March 3, 2026"));
        assert!(!body.contains("{{"));
    }

    #[test]
    fn test_custom_template_and_subject() {
        let template = EmailTemplate::new("Hi {{name}} from {{organization}}");
        assert_eq!(
            template.render(&recipient(), &metadata()),
            "Hi Alice &lt;3 from Yukti Yantra"
        );
        assert_eq!(EmailTemplate::subject(&metadata()), "Certificate for Rust Workshop");
    }

    #[test]
    fn test_attachment_naming() {
        assert_eq!(attachment_name("CERT-abc", "pdf"), "Certificate_CERT-abc.pdf");
        assert_eq!(mime_for_extension("PDF"), "application/pdf");
        assert_eq!(mime_for_extension("bin"), "application/octet-stream");
    }
}
