use certflow_pipeline::EnqueueSummary;
use certflow_store::ParticipationRecord;
use certflow_types::{
    layout, DeliveryStatus, Event, FieldDescriptor, GenerationStatus, ParticipationFilter,
    Recipient,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ========== 请求模型 ==========

/// 创建活动请求
#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub owner_id: String,
    pub template_ref: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    pub name: String,
    pub organization: Option<String>,
    pub date: Option<NaiveDate>,
}

/// 更新活动请求
#[derive(Debug, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub template_ref: Option<String>,
    pub fields: Option<Vec<FieldDescriptor>>,
    pub name: Option<String>,
    pub organization: Option<String>,
    pub date: Option<NaiveDate>,
}

impl UpdateEventRequest {
    pub fn touches_metadata(&self) -> bool {
        self.name.is_some() || self.organization.is_some() || self.date.is_some()
    }
}

/// 入队请求
#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub recipients: Vec<Recipient>,
}

/// 参与记录查询参数
#[derive(Debug, Default, Deserialize)]
pub struct ListParticipationsQuery {
    pub generation_status: Option<GenerationStatus>,
    pub delivery_status: Option<DeliveryStatus>,
}

impl From<ListParticipationsQuery> for ParticipationFilter {
    fn from(query: ListParticipationsQuery) -> Self {
        Self {
            generation_status: query.generation_status,
            delivery_status: query.delivery_status,
        }
    }
}

/// 进度查询参数，带 owner_id 时只返回该所有者的活动
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub owner_id: Option<String>,
}

// ========== 响应模型 ==========

/// 活动响应
#[derive(Debug, Serialize, Deserialize)]
pub struct EventResponse {
    pub id: String,
    pub owner_id: String,
    pub template_ref: String,
    pub fields: Vec<FieldDescriptor>,
    pub name: String,
    pub organization: Option<String>,
    pub date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        // 存量数据可能不合法，此处只做展示
        let fields = layout::parse(&event.field_layout).unwrap_or_default();

        Self {
            id: event.id,
            owner_id: event.owner_id,
            template_ref: event.template_ref,
            fields,
            name: event.metadata.name,
            organization: event.metadata.organization,
            date: event.metadata.date,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

/// 更新活动响应
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateEventResponse {
    pub event: EventResponse,
    pub reset: u64,
}

/// 删除活动响应
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteEventResponse {
    pub event_id: String,
    pub removed_participations: u64,
}

/// 入队响应
#[derive(Debug, Serialize, Deserialize)]
pub struct EnqueueResponse {
    pub event_id: String,
    pub queued: usize,
    pub created: usize,
    pub requeued: usize,
}

impl EnqueueResponse {
    pub fn new(event_id: String, summary: EnqueueSummary) -> Self {
        Self {
            event_id,
            queued: summary.queued,
            created: summary.created,
            requeued: summary.requeued,
        }
    }
}

/// 后台任务已受理
#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub event_id: String,
    pub job: String,
}

/// 生成失败重试响应
#[derive(Debug, Serialize, Deserialize)]
pub struct RetryResponse {
    pub event_id: String,
    pub reset: u64,
}

/// 参与记录详情
#[derive(Debug, Serialize, Deserialize)]
pub struct ParticipationResponse {
    pub id: String,
    pub participant_id: String,
    pub name: String,
    pub email: String,
    pub certificate_id: String,
    pub generation_status: GenerationStatus,
    pub delivery_status: DeliveryStatus,
    pub document_path: Option<String>,
    pub generation_error: Option<String>,
    pub delivery_error: Option<String>,
    pub delivery_attempts: u32,
    pub created_at: DateTime<Utc>,
    pub generated_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl From<ParticipationRecord> for ParticipationResponse {
    fn from(record: ParticipationRecord) -> Self {
        let p = record.participation;
        Self {
            id: p.id,
            participant_id: p.participant_id,
            name: record.participant.name,
            email: record.participant.email,
            certificate_id: p.certificate_id,
            generation_status: p.generation_status,
            delivery_status: p.delivery_status,
            document_path: p.document_path,
            generation_error: p.generation_error,
            delivery_error: p.delivery_error,
            delivery_attempts: p.delivery_attempts,
            created_at: p.created_at,
            generated_at: p.generated_at,
            sent_at: p.sent_at,
        }
    }
}

/// 列表响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub total: usize,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        let total = data.len();
        Self { data, total }
    }
}

/// 按扩展名推断预览内容类型
pub fn content_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "html" | "htm" => "text/html; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}
