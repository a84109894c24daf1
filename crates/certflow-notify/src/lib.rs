pub mod error;
pub mod mailer;
pub mod message;
pub mod smtp;

pub use error::{DeliveryError, DeliveryErrorKind, Result};
pub use mailer::Mailer;
pub use message::{attachment_name, DeliveryMetadata, EmailTemplate, MailRecipient};
pub use smtp::{SmtpConfig, SmtpMailer, TlsMode};
