use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 证书活动（一次生成任务）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// 活动 ID
    pub id: String,

    /// 创建者
    pub owner_id: String,

    /// 模板引用（文件名）
    pub template_ref: String,

    /// 字段布局（JSON 文本，见 [`crate::layout`]）
    pub field_layout: String,

    /// 展示信息
    pub metadata: EventMetadata,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 活动展示信息
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventMetadata {
    pub name: String,
    pub organization: Option<String>,
    pub date: Option<NaiveDate>,
}

impl Event {
    pub fn new(
        owner_id: impl Into<String>,
        template_ref: impl Into<String>,
        field_layout: impl Into<String>,
        metadata: EventMetadata,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: format!("evt_{}", uuid::Uuid::new_v4().simple()),
            owner_id: owner_id.into(),
            template_ref: template_ref.into(),
            field_layout: field_layout.into(),
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// 模板或字段布局是否与另一版本不同（需要重新渲染）
    pub fn needs_rerender(&self, other: &Event) -> bool {
        self.template_ref != other.template_ref || self.field_layout != other.field_layout
    }
}
