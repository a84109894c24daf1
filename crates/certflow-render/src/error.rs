use certflow_types::LayoutError;
use thiserror::Error;

/// 渲染错误类型
#[derive(Error, Debug)]
pub enum RenderError {
    /// 模板无法解析（配置错误，整个生成阶段失败）
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// 字段布局不合法
    #[error("Invalid field layout ({field}): {message}")]
    InvalidLayout { field: String, message: String },

    /// 模板图片格式不支持
    #[error("Unsupported template image: {0}")]
    UnsupportedImage(String),

    /// 渲染引擎错误
    #[error("Engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;

impl From<LayoutError> for RenderError {
    fn from(err: LayoutError) -> Self {
        match err {
            LayoutError::Malformed(message) => RenderError::InvalidLayout {
                field: "layout".to_string(),
                message,
            },
            LayoutError::InvalidField { field, message } => {
                RenderError::InvalidLayout { field, message }
            }
        }
    }
}

impl RenderError {
    pub fn engine(msg: impl Into<String>) -> Self {
        RenderError::Engine(msg.into())
    }

    /// 是否为配置类错误
    pub fn is_configuration(&self) -> bool {
        matches!(self, RenderError::TemplateNotFound(_))
    }
}
