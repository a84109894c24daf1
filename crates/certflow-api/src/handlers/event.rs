use crate::{error::Result, models::*, state::AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use certflow_pipeline::{EventUpdate, NewEvent};
use certflow_types::EventMetadata;
use tracing::{debug, info};

/// 创建活动
pub async fn create_event(
    State(state): State<AppState>,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventResponse>)> {
    info!(owner_id = %req.owner_id, name = %req.name, "Creating event");

    let new_event = NewEvent {
        template_ref: req.template_ref,
        fields: req.fields,
        metadata: EventMetadata {
            name: req.name,
            organization: req.organization,
            date: req.date,
        },
    };

    let event = state.orchestrator.create_event(&req.owner_id, new_event).await?;

    Ok((StatusCode::CREATED, Json(EventResponse::from(event))))
}

/// 获取活动
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<EventResponse>> {
    debug!(event_id = %event_id, "Getting event");

    let event = state.orchestrator.get_event(&event_id).await?;

    Ok(Json(EventResponse::from(event)))
}

/// 更新活动
///
/// 元数据按字段合并；模板或布局变化会重置全部参与记录。
pub async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Json<UpdateEventResponse>> {
    info!(event_id = %event_id, "Updating event");

    let metadata = if req.touches_metadata() {
        let mut metadata = state.orchestrator.get_event(&event_id).await?.metadata;
        if let Some(name) = req.name {
            metadata.name = name;
        }
        if let Some(organization) = req.organization {
            metadata.organization = Some(organization);
        }
        if let Some(date) = req.date {
            metadata.date = Some(date);
        }
        Some(metadata)
    } else {
        None
    };

    let update = EventUpdate {
        template_ref: req.template_ref,
        fields: req.fields,
        metadata,
    };

    let updated = state.orchestrator.update_event(&event_id, update).await?;

    Ok(Json(UpdateEventResponse {
        event: EventResponse::from(updated.event),
        reset: updated.reset,
    }))
}

/// 删除活动
pub async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<DeleteEventResponse>> {
    info!(event_id = %event_id, "Deleting event");

    let removed = state.orchestrator.delete_event(&event_id).await?;

    Ok(Json(DeleteEventResponse {
        event_id,
        removed_participations: removed,
    }))
}
