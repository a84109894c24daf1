use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use certflow_pipeline::PipelineError;
use certflow_render::RenderError;
use certflow_store::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API 错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    /// 活动未找到
    #[error("Event not found: {0}")]
    EventNotFound(String),

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 数据库错误
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::EventNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::DatabaseError(_) | ApiError::InternalError(_) => {
                error!(error = %self, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

// 从 PipelineError 转换
impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::EventNotFound(id) => ApiError::EventNotFound(id),
            PipelineError::InvalidInput(msg) => ApiError::ValidationError(msg),
            PipelineError::Layout(e) => ApiError::ValidationError(e.to_string()),
            PipelineError::Store(StoreError::NotFound(what)) => ApiError::EventNotFound(what),
            PipelineError::Store(e) => ApiError::DatabaseError(e.to_string()),
            PipelineError::Render(e @ RenderError::TemplateNotFound(_))
            | PipelineError::Render(e @ RenderError::InvalidLayout { .. })
            | PipelineError::Render(e @ RenderError::UnsupportedImage(_)) => {
                ApiError::ValidationError(e.to_string())
            }
            PipelineError::Render(e) => ApiError::InternalError(e.to_string()),
            PipelineError::Delivery(e) => ApiError::InternalError(e.to_string()),
            PipelineError::Io(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
