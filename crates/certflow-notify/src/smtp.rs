use crate::error::{DeliveryError, Result};
use crate::mailer::Mailer;
use crate::message::{attachment_name, mime_for_extension, DeliveryMetadata, EmailTemplate, MailRecipient};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// SMTP 连接加密方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    #[default]
    Starttls,
    Tls,
    None,
}

/// SMTP 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// 发件人，缺省为 username
    pub from: Option<String>,
    pub tls: TlsMode,
    /// 邮件正文模板文件
    pub body_template: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: None,
            password: None,
            from: None,
            tls: TlsMode::Starttls,
            body_template: None,
            timeout_secs: 30,
        }
    }
}

impl SmtpConfig {
    /// 凭据齐全时返回 (username, password)
    fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }

    fn sender(&self) -> Option<&str> {
        self.from
            .as_deref()
            .filter(|from| !from.is_empty())
            .or(self.username.as_deref())
    }
}

/// 基于 lettre 的 SMTP 投递器
pub struct SmtpMailer {
    config: SmtpConfig,
    template: EmailTemplate,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpMailer {
    /// 创建投递器
    ///
    /// 凭据缺失时仍然可以创建，但每次投递都会返回配置错误。
    pub fn new(config: SmtpConfig) -> Result<Self> {
        let template = match &config.body_template {
            Some(path) => EmailTemplate::load(path).map_err(|e| {
                DeliveryError::Build(format!(
                    "failed to read body template {}: {}",
                    path.display(),
                    e
                ))
            })?,
            None => EmailTemplate::default(),
        };

        let transport = match config.credentials() {
            Some((user, pass)) => Some(build_transport(&config, user, pass)?),
            None => {
                warn!(host = %config.host, "SMTP credentials not configured, delivery disabled");
                None
            }
        };

        Ok(Self {
            config,
            template,
            transport,
        })
    }

    fn build_message(
        &self,
        recipient: &MailRecipient,
        metadata: &DeliveryMetadata,
        attachment_path: &Path,
        attachment: Vec<u8>,
    ) -> Result<Message> {
        let sender = self
            .config
            .sender()
            .ok_or_else(|| DeliveryError::MissingCredentials("sender address".to_string()))?;
        let from: Mailbox = sender
            .parse()
            .map_err(|e| DeliveryError::Build(format!("invalid sender {}: {}", sender, e)))?;

        let address = recipient
            .email
            .parse()
            .map_err(|e| DeliveryError::AddressRejected(format!("{}: {}", recipient.email, e)))?;
        let to = Mailbox::new(Some(recipient.name.clone()), address);

        let extension = attachment_path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("pdf");
        let content_type = ContentType::parse(mime_for_extension(extension))
            .map_err(|e| DeliveryError::Build(e.to_string()))?;
        let attachment = Attachment::new(attachment_name(&recipient.certificate_id, extension))
            .body(attachment, content_type);

        Message::builder()
            .from(from)
            .to(to)
            .subject(EmailTemplate::subject(metadata))
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::html(self.template.render(recipient, metadata)))
                    .singlepart(attachment),
            )
            .map_err(|e| DeliveryError::Build(e.to_string()))
    }
}

fn build_transport(
    config: &SmtpConfig,
    username: &str,
    password: &str,
) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
    let builder = match config.tls {
        TlsMode::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| DeliveryError::Build(e.to_string()))?,
        TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| DeliveryError::Build(e.to_string()))?,
        TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
    };

    Ok(builder
        .port(config.port)
        .credentials(Credentials::new(username.to_string(), password.to_string()))
        .timeout(Some(Duration::from_secs(config.timeout_secs)))
        .build())
}

/// 按 SMTP 响应码分类传输错误
fn classify(err: lettre::transport::smtp::Error) -> DeliveryError {
    let message = err.to_string();
    match err.status().map(|code| code.to_string()) {
        Some(code) if code == "530" || code == "535" => DeliveryError::MissingCredentials(message),
        Some(code) if code.starts_with('5') => DeliveryError::AddressRejected(message),
        _ => DeliveryError::Transient(message),
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn check_configured(&self) -> Result<()> {
        if self.transport.is_none() {
            return Err(DeliveryError::MissingCredentials(
                "set smtp.username and smtp.password".to_string(),
            ));
        }
        if self.config.sender().is_none() {
            return Err(DeliveryError::MissingCredentials("sender address".to_string()));
        }
        Ok(())
    }

    async fn send(
        &self,
        recipient: &MailRecipient,
        attachment_path: &Path,
        metadata: &DeliveryMetadata,
    ) -> Result<()> {
        self.check_configured()?;
        let transport = self.transport.as_ref().ok_or_else(|| {
            DeliveryError::MissingCredentials("set smtp.username and smtp.password".to_string())
        })?;

        let attachment = match tokio::fs::read(attachment_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DeliveryError::AttachmentMissing(
                    attachment_path.display().to_string(),
                ));
            }
            Err(e) => return Err(DeliveryError::Transient(e.to_string())),
        };

        let message = self.build_message(recipient, metadata, attachment_path, attachment)?;
        let response = transport.send(message).await.map_err(classify)?;

        debug!(
            email = %recipient.email,
            certificate_id = %recipient.certificate_id,
            code = %response.code(),
            "Email sent"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "smtp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient() -> MailRecipient {
        MailRecipient {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            certificate_id: "CERT-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let mailer = SmtpMailer::new(SmtpConfig::default()).unwrap();

        let err = mailer.check_configured().unwrap_err();
        assert!(matches!(err, DeliveryError::MissingCredentials(_)));

        let err = mailer
            .send(&recipient(), Path::new("/nonexistent.pdf"), &DeliveryMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::MissingCredentials(_)));
    }

    #[tokio::test]
    async fn test_missing_attachment() {
        let config = SmtpConfig {
            host: "localhost".to_string(),
            port: 2525,
            username: Some("mailer@example.com".to_string()),
            password: Some("secret".to_string()),
            tls: TlsMode::None,
            ..Default::default()
        };
        let mailer = SmtpMailer::new(config).unwrap();
        assert!(mailer.check_configured().is_ok());

        let dir = tempfile::tempdir().unwrap();
        let err = mailer
            .send(
                &recipient(),
                &dir.path().join("missing.pdf"),
                &DeliveryMetadata::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::AttachmentMissing(_)));
    }

    #[tokio::test]
    async fn test_build_message() {
        let config = SmtpConfig {
            host: "localhost".to_string(),
            username: Some("mailer@example.com".to_string()),
            password: Some("secret".to_string()),
            from: Some("Certificates <certs@example.com>".to_string()),
            tls: TlsMode::None,
            ..Default::default()
        };
        let mailer = SmtpMailer::new(config).unwrap();
        let metadata = DeliveryMetadata {
            event_name: "RustConf".to_string(),
            organization_name: "Yukti Yantra".to_string(),
            event_date: "May 1, 2026".to_string(),
        };

        let message = mailer
            .build_message(&recipient(), &metadata, Path::new("/tmp/CERT-1_Alice.pdf"), b"%PDF".to_vec())
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: Certificate for RustConf"));
        assert!(raw.contains("Certificate_CERT-1.pdf"));
        assert!(raw.contains("application/pdf"));

        let mut bad = recipient();
        bad.email = "not-an-address".to_string();
        let err = mailer
            .build_message(&bad, &metadata, Path::new("/tmp/x.pdf"), Vec::new())
            .unwrap_err();
        assert!(matches!(err, DeliveryError::AddressRejected(_)));
    }
}
