use crate::{error::Result, models::*, state::AppState};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use certflow_types::{EventStatus, Recipient};
use tracing::{debug, info};

/// 参与者入队
pub async fn enqueue_participants(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(req): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<EnqueueResponse>)> {
    info!(event_id = %event_id, recipients = req.recipients.len(), "Enqueueing participants");

    let summary = state.orchestrator.enqueue(&event_id, req.recipients).await?;

    Ok((StatusCode::ACCEPTED, Json(EnqueueResponse::new(event_id, summary))))
}

/// 触发生成，后台执行
pub async fn trigger_generation(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<(StatusCode, Json<AcceptedResponse>)> {
    state.orchestrator.get_event(&event_id).await?;
    info!(event_id = %event_id, "Generation triggered");

    let _job = state.orchestrator.trigger_generation(&event_id);

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            event_id,
            job: "generation".to_string(),
        }),
    ))
}

/// 触发投递，后台执行
pub async fn trigger_delivery(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<(StatusCode, Json<AcceptedResponse>)> {
    state.orchestrator.get_event(&event_id).await?;
    info!(event_id = %event_id, "Delivery triggered");

    let _job = state.orchestrator.trigger_delivery(&event_id);

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            event_id,
            job: "delivery".to_string(),
        }),
    ))
}

/// 重置生成失败的记录并重新触发生成
pub async fn retry_failed_generation(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<(StatusCode, Json<RetryResponse>)> {
    let reset = state.orchestrator.retry_failed_generation(&event_id).await?;
    info!(event_id = %event_id, reset, "Failed generation re-queued");

    if reset > 0 {
        let _job = state.orchestrator.trigger_generation(&event_id);
    }

    Ok((StatusCode::ACCEPTED, Json(RetryResponse { event_id, reset })))
}

/// 获取活动进度
///
/// 未知活动返回 found=false 的零计数，而不是 404。
pub async fn get_status(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<EventStatus>> {
    debug!(event_id = %event_id, "Getting event status");

    let status = match query.owner_id {
        Some(owner_id) => {
            state
                .orchestrator
                .get_status_for_owner(&event_id, &owner_id)
                .await?
        }
        None => state.orchestrator.get_status(&event_id).await?,
    };

    Ok(Json(status))
}

/// 列出参与记录
pub async fn list_participations(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Query(query): Query<ListParticipationsQuery>,
) -> Result<Json<ListResponse<ParticipationResponse>>> {
    debug!(event_id = %event_id, "Listing participations");

    let records = state
        .orchestrator
        .list_participations(&event_id, &query.into())
        .await?;

    let data = records.into_iter().map(ParticipationResponse::from).collect();

    Ok(Json(ListResponse::new(data)))
}

/// 为临时收件人预览文档
pub async fn preview(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(recipient): Json<Recipient>,
) -> Result<impl IntoResponse> {
    debug!(event_id = %event_id, name = %recipient.name, "Rendering preview");

    let document = state.orchestrator.preview(&event_id, &recipient).await?;

    Ok((
        [(header::CONTENT_TYPE, content_type_for(&document.extension))],
        document.bytes,
    ))
}
