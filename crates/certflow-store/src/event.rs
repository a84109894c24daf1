use crate::db::{event, participation};
use crate::error::{Result, StoreError};
use certflow_types::Event;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
};
use std::sync::Arc;
use tracing::{debug, info};

/// 活动仓库
pub struct EventRepository {
    db: Arc<DatabaseConnection>,
}

impl EventRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 新建活动
    pub async fn insert(&self, event: Event) -> Result<Event> {
        let active_model: event::ActiveModel = event.clone().into();
        event::Entity::insert(active_model).exec(&*self.db).await?;

        info!(event_id = %event.id, name = %event.metadata.name, "Event created");
        Ok(event)
    }

    /// 查询活动
    pub async fn get(&self, event_id: &str) -> Result<Option<Event>> {
        let model = event::Entity::find_by_id(event_id.to_string())
            .one(&*self.db)
            .await?;

        Ok(model.map(Event::from))
    }

    /// 按 ID 和所有者查询
    pub async fn get_owned(&self, event_id: &str, owner_id: &str) -> Result<Option<Event>> {
        let model = event::Entity::find_by_id(event_id.to_string())
            .filter(event::Column::OwnerId.eq(owner_id))
            .one(&*self.db)
            .await?;

        Ok(model.map(Event::from))
    }

    /// 更新活动
    pub async fn update(&self, mut event: Event) -> Result<Event> {
        if self.get(&event.id).await?.is_none() {
            return Err(StoreError::not_found(format!("event {}", event.id)));
        }

        event.updated_at = chrono::Utc::now();
        let active_model: event::ActiveModel = event.clone().into();
        active_model.update(&*self.db).await?;

        debug!(event_id = %event.id, "Event updated");
        Ok(event)
    }

    /// 删除活动及其全部参与记录
    pub async fn delete(&self, event_id: &str) -> Result<u64> {
        let txn = self.db.begin().await?;

        let removed = participation::Entity::delete_many()
            .filter(participation::Column::EventId.eq(event_id))
            .exec(&txn)
            .await?
            .rows_affected;

        let deleted = event::Entity::delete_by_id(event_id.to_string())
            .exec(&txn)
            .await?
            .rows_affected;

        txn.commit().await?;

        if deleted == 0 {
            return Err(StoreError::not_found(format!("event {}", event_id)));
        }

        info!(event_id = %event_id, participations = removed, "Event deleted");
        Ok(removed)
    }
}
