use anyhow::{anyhow, Result};
use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::AppConfig;

/// 环境变量前缀，例如 `CERTFLOW__SMTP__PASSWORD`
pub const ENV_PREFIX: &str = "CERTFLOW";

/// 配置加载器
///
/// 优先级从低到高：内置默认值、TOML 文件、环境变量。
pub struct ConfigLoader {
    config_file: Option<PathBuf>,
    env_source: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_file: None,
            env_source: None,
        }
    }

    /// 指定配置文件（必须存在）
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// 用给定的键值代替进程环境变量
    pub fn with_env_source(mut self, source: HashMap<String, String>) -> Self {
        self.env_source = Some(source);
        self
    }

    /// 加载并校验配置
    pub fn load(&self) -> Result<AppConfig> {
        let mut builder = Config::builder();

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(anyhow!("Config file not found: {}", path.display()));
            }
            builder = builder.add_source(File::new(
                path.to_str().ok_or_else(|| anyhow!("Invalid config path"))?,
                FileFormat::Toml,
            ));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(self.env_source.clone()),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// 校验配置
    pub fn validate(config: &AppConfig) -> Result<()> {
        if config.pipeline.generation_batch_size == 0 {
            return Err(anyhow!("pipeline.generation_batch_size must be greater than 0"));
        }
        if config.pipeline.delivery_batch_size == 0 {
            return Err(anyhow!("pipeline.delivery_batch_size must be greater than 0"));
        }
        if config.storage.documents_dir.as_os_str().is_empty() {
            return Err(anyhow!("storage.documents_dir must not be empty"));
        }
        if config.storage.templates_dir.as_os_str().is_empty() {
            return Err(anyhow!("storage.templates_dir must not be empty"));
        }
        if config.database.url.trim().is_empty() {
            return Err(anyhow!("database.url must not be empty"));
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
