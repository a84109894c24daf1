use crate::participation::{DeliveryStatus, GenerationStatus};
use serde::{Deserialize, Serialize};

/// 活动进度汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStatus {
    pub event_id: String,
    /// 活动不存在时为 false，所有计数为 0
    pub found: bool,
    pub total: u64,
    pub generation: GenerationCounts,
    pub delivery: DeliveryCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationCounts {
    pub generated: u64,
    pub failed: u64,
    pub pending: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryCounts {
    pub sent: u64,
    pub failed: u64,
    pub pending: u64,
}

impl EventStatus {
    pub fn not_found(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            ..Default::default()
        }
    }

    /// 由 (generation, delivery) 分组计数构建
    ///
    /// delivery.pending = total - sent - failed，尚未进入投递阶段的记录也算作 pending。
    pub fn from_groups<I>(event_id: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = (GenerationStatus, DeliveryStatus, u64)>,
    {
        let mut status = Self {
            event_id: event_id.into(),
            found: true,
            ..Default::default()
        };

        for (generation, delivery, count) in groups {
            status.total += count;

            match generation {
                GenerationStatus::Generated => status.generation.generated += count,
                GenerationStatus::Failed => status.generation.failed += count,
                GenerationStatus::Pending => status.generation.pending += count,
            }

            match delivery {
                DeliveryStatus::Sent => status.delivery.sent += count,
                DeliveryStatus::Failed => status.delivery.failed += count,
                DeliveryStatus::Pending => {}
            }
        }

        status.delivery.pending = status
            .total
            .saturating_sub(status.delivery.sent + status.delivery.failed);

        status
    }
}
