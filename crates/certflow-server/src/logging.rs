use anyhow::{anyhow, Result};
use certflow_config::{LogFormat, LoggingConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化日志
///
/// `RUST_LOG` 优先，否则使用配置中的级别。
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(&config.level);

    let result = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init(),
    };

    result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
