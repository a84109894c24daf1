use thiserror::Error;

/// 存储层错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    /// 记录未找到
    #[error("Not found: {0}")]
    NotFound(String),

    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 持久化数据不符合领域约束
    #[error("Invalid stored state: {0}")]
    InvalidState(String),
}

/// 存储层结果类型
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        StoreError::NotFound(what.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        StoreError::InvalidState(msg.into())
    }
}
