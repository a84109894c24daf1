use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 生成状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Pending,
    Generated,
    Failed,
}

/// 投递状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Generated => "generated",
            GenerationStatus::Failed => "failed",
        }
    }
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }
}

impl FromStr for GenerationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(GenerationStatus::Pending),
            "generated" => Ok(GenerationStatus::Generated),
            "failed" => Ok(GenerationStatus::Failed),
            other => Err(format!("unknown generation status: {}", other)),
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeliveryStatus::Pending),
            "sent" => Ok(DeliveryStatus::Sent),
            "failed" => Ok(DeliveryStatus::Failed),
            other => Err(format!("unknown delivery status: {}", other)),
        }
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 活动与参与者的关联记录，流水线的工作单元
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventParticipation {
    pub id: String,
    pub event_id: String,
    pub participant_id: String,

    /// 证书 ID，由服务端生成，也是产物文件名的幂等键
    pub certificate_id: String,

    pub generation_status: GenerationStatus,
    pub delivery_status: DeliveryStatus,

    /// 仅当 generation_status = generated 时存在
    pub document_path: Option<String>,

    pub generation_error: Option<String>,
    pub delivery_error: Option<String>,
    pub delivery_attempts: u32,

    pub created_at: DateTime<Utc>,
    pub generated_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl EventParticipation {
    /// 新建 pending/pending 记录
    pub fn new(event_id: impl Into<String>, participant_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_id: event_id.into(),
            participant_id: participant_id.into(),
            certificate_id: new_certificate_id(),
            generation_status: GenerationStatus::Pending,
            delivery_status: DeliveryStatus::Pending,
            document_path: None,
            generation_error: None,
            delivery_error: None,
            delivery_attempts: 0,
            created_at: Utc::now(),
            generated_at: None,
            sent_at: None,
        }
    }

    /// 产物文件名：`<certificateId>_<sanitizedName>.<ext>`
    pub fn document_file_name(&self, recipient_name: &str, extension: &str) -> String {
        format!(
            "{}_{}.{}",
            self.certificate_id,
            sanitize_name(recipient_name),
            extension
        )
    }
}

/// 生成新的证书 ID
pub fn new_certificate_id() -> String {
    format!("CERT-{}", uuid::Uuid::new_v4().simple())
}

/// 去掉 `[A-Za-z0-9_]` 以外的所有字符
pub fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();

    if sanitized.is_empty() {
        "Participant".to_string()
    } else {
        sanitized
    }
}

/// 关联记录查询条件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipationFilter {
    pub generation_status: Option<GenerationStatus>,
    pub delivery_status: Option<DeliveryStatus>,
}
