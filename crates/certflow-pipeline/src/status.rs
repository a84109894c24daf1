use crate::error::Result;
use certflow_store::{EventRepository, ParticipationRepository};
use certflow_types::EventStatus;
use std::sync::Arc;

/// 进度统计
///
/// 只做一次分组查询，不加锁，可能观察到批次写入的中间状态。
pub struct StatusAggregator {
    events: Arc<EventRepository>,
    participations: Arc<ParticipationRepository>,
}

impl StatusAggregator {
    pub fn new(events: Arc<EventRepository>, participations: Arc<ParticipationRepository>) -> Self {
        Self {
            events,
            participations,
        }
    }

    /// 未知活动返回 found = false 的全零结果
    pub async fn get_status(&self, event_id: &str) -> Result<EventStatus> {
        if self.events.get(event_id).await?.is_none() {
            return Ok(EventStatus::not_found(event_id));
        }
        self.aggregate(event_id).await
    }

    /// 按所有者查询，不属于该所有者的活动同样视为未找到
    pub async fn get_status_for_owner(&self, event_id: &str, owner_id: &str) -> Result<EventStatus> {
        if self.events.get_owned(event_id, owner_id).await?.is_none() {
            return Ok(EventStatus::not_found(event_id));
        }
        self.aggregate(event_id).await
    }

    async fn aggregate(&self, event_id: &str) -> Result<EventStatus> {
        let groups = self.participations.count_by_status(event_id).await?;
        Ok(EventStatus::from_groups(event_id, groups))
    }
}
