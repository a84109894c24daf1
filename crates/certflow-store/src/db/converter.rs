use super::entity::{event, participant, participation};
use crate::error::StoreError;
use certflow_types::{
    DeliveryStatus, Event, EventMetadata, EventParticipation, GenerationStatus, Participant,
};
use sea_orm::ActiveValue::Set;
use serde_json::{Map, Value as JsonValue};

/// Event 模型与数据库实体的转换
impl From<Event> for event::ActiveModel {
    fn from(event: Event) -> Self {
        Self {
            id: Set(event.id),
            owner_id: Set(event.owner_id),
            template_ref: Set(event.template_ref),
            field_layout: Set(event.field_layout),
            name: Set(event.metadata.name),
            organization: Set(event.metadata.organization),
            event_date: Set(event.metadata.date),
            created_at: Set(event.created_at),
            updated_at: Set(event.updated_at),
        }
    }
}

impl From<event::Model> for Event {
    fn from(model: event::Model) -> Self {
        Self {
            id: model.id,
            owner_id: model.owner_id,
            template_ref: model.template_ref,
            field_layout: model.field_layout,
            metadata: EventMetadata {
                name: model.name,
                organization: model.organization,
                date: model.event_date,
            },
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Participant 模型与数据库实体的转换
impl From<Participant> for participant::ActiveModel {
    fn from(participant: Participant) -> Self {
        Self {
            id: Set(participant.id),
            owner_id: Set(participant.owner_id),
            name: Set(participant.name),
            email: Set(participant.email),
            custom_data: Set(custom_data_to_json(participant.custom_data)),
            created_at: Set(participant.created_at),
        }
    }
}

impl From<participant::Model> for Participant {
    fn from(model: participant::Model) -> Self {
        Self {
            id: model.id,
            owner_id: model.owner_id,
            name: model.name,
            email: model.email,
            custom_data: json_to_custom_data(model.custom_data),
            created_at: model.created_at,
        }
    }
}

/// EventParticipation 模型与数据库实体的转换
impl From<EventParticipation> for participation::ActiveModel {
    fn from(record: EventParticipation) -> Self {
        Self {
            id: Set(record.id),
            event_id: Set(record.event_id),
            participant_id: Set(record.participant_id),
            certificate_id: Set(record.certificate_id),
            generation_status: Set(record.generation_status.as_str().to_string()),
            delivery_status: Set(record.delivery_status.as_str().to_string()),
            document_path: Set(record.document_path),
            generation_error: Set(record.generation_error),
            delivery_error: Set(record.delivery_error),
            delivery_attempts: Set(record.delivery_attempts as i32),
            created_at: Set(record.created_at),
            generated_at: Set(record.generated_at),
            sent_at: Set(record.sent_at),
        }
    }
}

impl TryFrom<participation::Model> for EventParticipation {
    type Error = StoreError;

    fn try_from(model: participation::Model) -> Result<Self, Self::Error> {
        let generation_status: GenerationStatus = model
            .generation_status
            .parse()
            .map_err(StoreError::InvalidState)?;
        let delivery_status: DeliveryStatus = model
            .delivery_status
            .parse()
            .map_err(StoreError::InvalidState)?;

        Ok(Self {
            id: model.id,
            event_id: model.event_id,
            participant_id: model.participant_id,
            certificate_id: model.certificate_id,
            generation_status,
            delivery_status,
            document_path: model.document_path,
            generation_error: model.generation_error,
            delivery_error: model.delivery_error,
            delivery_attempts: model.delivery_attempts.max(0) as u32,
            created_at: model.created_at,
            generated_at: model.generated_at,
            sent_at: model.sent_at,
        })
    }
}

// ========== 辅助函数 ==========

/// 将自定义字段转换为 JSON
fn custom_data_to_json(data: Map<String, JsonValue>) -> Option<JsonValue> {
    if data.is_empty() {
        None
    } else {
        Some(JsonValue::Object(data))
    }
}

/// 将 JSON 转换为自定义字段
fn json_to_custom_data(json: Option<JsonValue>) -> Map<String, JsonValue> {
    match json {
        Some(JsonValue::Object(map)) => map,
        _ => Map::new(),
    }
}
