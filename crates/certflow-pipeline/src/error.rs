use thiserror::Error;

/// 流水线错误类型
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Layout(#[from] certflow_types::LayoutError),

    #[error(transparent)]
    Store(#[from] certflow_store::StoreError),

    #[error(transparent)]
    Render(#[from] certflow_render::RenderError),

    #[error(transparent)]
    Delivery(#[from] certflow_notify::DeliveryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
