use crate::db::participant;
use crate::error::Result;
use certflow_types::{Participant, Recipient};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use tracing::{debug, warn};

/// 参与者仓库
pub struct ParticipantRepository {
    db: Arc<DatabaseConnection>,
}

impl ParticipantRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn get(&self, participant_id: &str) -> Result<Option<Participant>> {
        let model = participant::Entity::find_by_id(participant_id.to_string())
            .one(&*self.db)
            .await?;

        Ok(model.map(Participant::from))
    }

    /// 按 (owner, email) 查询
    pub async fn find_by_email(&self, owner_id: &str, email: &str) -> Result<Option<Participant>> {
        let model = participant::Entity::find()
            .filter(participant::Column::OwnerId.eq(owner_id))
            .filter(participant::Column::Email.eq(email))
            .one(&*self.db)
            .await?;

        Ok(model.map(Participant::from))
    }

    /// 查找或创建参与者
    ///
    /// 已存在的参与者原样返回，不会用新数据覆盖。
    pub async fn find_or_create(&self, owner_id: &str, recipient: Recipient) -> Result<Participant> {
        if let Some(existing) = self.find_by_email(owner_id, &recipient.email).await? {
            debug!(participant_id = %existing.id, "Participant found");
            return Ok(existing);
        }

        let email = recipient.email.clone();
        let participant = Participant::new(owner_id, recipient);
        let active_model: participant::ActiveModel = participant.clone().into();

        match participant::Entity::insert(active_model).exec(&*self.db).await {
            Ok(_) => {
                debug!(participant_id = %participant.id, "Participant created");
                Ok(participant)
            }
            Err(e) => {
                // 并发入队时唯一索引冲突，回读已存在的记录
                if let Some(existing) = self.find_by_email(owner_id, &email).await? {
                    warn!(email = %email, "Participant created concurrently, reusing");
                    Ok(existing)
                } else {
                    Err(e.into())
                }
            }
        }
    }
}
