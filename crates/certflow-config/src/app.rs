use certflow_notify::SmtpConfig;
use certflow_pipeline::{BrandingConfig, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 应用配置
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
    pub smtp: SmtpConfig,
    pub branding: BrandingConfig,
    pub logging: LoggingConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sea-orm 连接串
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://certflow.db?mode=rwc".to_string(),
        }
    }
}

/// 文件目录配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub templates_dir: PathBuf,
    pub documents_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("./data/templates"),
            documents_dir: PathBuf::from("./data/documents"),
        }
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// 日志配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 默认过滤级别，RUST_LOG 优先
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
