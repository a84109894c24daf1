use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 数据合并时的优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePrecedence {
    /// 参与者自定义字段覆盖活动信息
    #[default]
    Participant,
    /// 活动信息覆盖同名的参与者字段
    Event,
}

/// 流水线节流与重试参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 生成批大小（批内并发）
    pub generation_batch_size: usize,
    /// 生成批间隔（毫秒）
    pub generation_batch_delay_ms: u64,
    /// 投递批大小
    pub delivery_batch_size: usize,
    /// 投递批间隔（毫秒）
    pub delivery_item_delay_ms: u64,
    /// 首次尝试之外的最大重试次数
    pub delivery_max_retries: u32,
    /// 退避基数（毫秒），第 i 次重试前等待 base * 2^i
    pub delivery_backoff_base_ms: u64,
    pub merge_precedence: MergePrecedence,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            generation_batch_size: 5,
            generation_batch_delay_ms: 1000,
            delivery_batch_size: 1,
            delivery_item_delay_ms: 1500,
            delivery_max_retries: 3,
            delivery_backoff_base_ms: 1000,
            merge_precedence: MergePrecedence::Participant,
        }
    }
}

impl PipelineConfig {
    pub fn generation_batch_delay(&self) -> Duration {
        Duration::from_millis(self.generation_batch_delay_ms)
    }

    pub fn delivery_item_delay(&self) -> Duration {
        Duration::from_millis(self.delivery_item_delay_ms)
    }

    /// 第 `retry` 次重试（从 0 开始）前的等待时间
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        Duration::from_millis(self.delivery_backoff_base_ms.saturating_mul(factor))
    }

    /// 单条记录的最大尝试次数
    pub fn max_attempts(&self) -> u32 {
        self.delivery_max_retries.saturating_add(1)
    }
}

/// 证书与邮件中使用的默认品牌信息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandingConfig {
    pub default_organization: String,
    /// chrono 格式串
    pub date_format: String,
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            default_organization: "Yukti Yantra".to_string(),
            date_format: "%B %-d, %Y".to_string(),
        }
    }
}
