use crate::{handlers, state::AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// 创建 API 路由
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // 健康检查
        .route("/health", get(health_check))

        // 活动管理 API
        .route("/api/v1/events", post(handlers::create_event))
        .route(
            "/api/v1/events/:event_id",
            get(handlers::get_event)
                .put(handlers::update_event)
                .delete(handlers::delete_event),
        )

        // 流水线 API
        .route("/api/v1/events/:event_id/participants", post(handlers::enqueue_participants))
        .route("/api/v1/events/:event_id/generate", post(handlers::trigger_generation))
        .route("/api/v1/events/:event_id/deliver", post(handlers::trigger_delivery))
        .route("/api/v1/events/:event_id/generation/retry", post(handlers::retry_failed_generation))
        .route("/api/v1/events/:event_id/status", get(handlers::get_status))
        .route("/api/v1/events/:event_id/participations", get(handlers::list_participations))
        .route("/api/v1/events/:event_id/preview", post(handlers::preview))

        // 添加中间件
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 健康检查
async fn health_check() -> &'static str {
    "OK"
}
