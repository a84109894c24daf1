use crate::db::{participant, participation};
use crate::error::{Result, StoreError};
use certflow_types::{
    new_certificate_id, DeliveryStatus, EventParticipation, GenerationStatus, Participant,
    ParticipationFilter,
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, UpdateMany,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 参与记录及其参与者
#[derive(Debug, Clone)]
pub struct ParticipationRecord {
    pub participation: EventParticipation,
    pub participant: Participant,
}

/// 参与记录仓库
///
/// 所有状态写入都是按字段的部分更新：生成字段只由生成任务写，投递字段只由投递任务写，
/// 互不覆盖。写入时附带 certificate_id 条件，重新入队后旧任务的迟到结果不会生效；
/// 投递写入不会改动已是 sent 的记录。
pub struct ParticipationRepository {
    db: Arc<DatabaseConnection>,
}

impl ParticipationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 按主键查询
    pub async fn get(&self, id: &str) -> Result<Option<EventParticipation>> {
        participation::Entity::find_by_id(id.to_string())
            .one(&*self.db)
            .await?
            .map(EventParticipation::try_from)
            .transpose()
    }

    /// 按 (活动, 参与者) 查询
    pub async fn find(
        &self,
        event_id: &str,
        participant_id: &str,
    ) -> Result<Option<EventParticipation>> {
        participation::Entity::find()
            .filter(participation::Column::EventId.eq(event_id))
            .filter(participation::Column::ParticipantId.eq(participant_id))
            .one(&*self.db)
            .await?
            .map(EventParticipation::try_from)
            .transpose()
    }

    /// 入队：不存在则创建，存在则重置为 pending/pending 并分配新的证书 ID
    ///
    /// 返回记录以及是否为新建。旧的产物文件不会被删除。
    pub async fn upsert_pending(
        &self,
        event_id: &str,
        participant_id: &str,
    ) -> Result<(EventParticipation, bool)> {
        if let Some(existing) = self.find(event_id, participant_id).await? {
            return Ok((self.requeue(existing).await?, false));
        }

        let record = EventParticipation::new(event_id, participant_id);
        let active_model: participation::ActiveModel = record.clone().into();

        if let Err(e) = participation::Entity::insert(active_model)
            .exec(&*self.db)
            .await
        {
            // 并发入队时唯一索引冲突，改为重置已存在的记录
            return match self.find(event_id, participant_id).await? {
                Some(existing) => {
                    warn!(
                        event_id = %event_id,
                        participant_id = %participant_id,
                        "Participation created concurrently, re-queueing"
                    );
                    Ok((self.requeue(existing).await?, false))
                }
                None => Err(e.into()),
            };
        }

        debug!(
            event_id = %event_id,
            participant_id = %participant_id,
            certificate_id = %record.certificate_id,
            "Participation created"
        );
        Ok((record, true))
    }

    async fn requeue(&self, existing: EventParticipation) -> Result<EventParticipation> {
        let certificate_id = new_certificate_id();
        reset_columns(participation::Entity::update_many(), &certificate_id)
            .filter(participation::Column::Id.eq(existing.id.as_str()))
            .exec(&*self.db)
            .await?;

        debug!(
            event_id = %existing.event_id,
            participant_id = %existing.participant_id,
            old_certificate_id = %existing.certificate_id,
            certificate_id = %certificate_id,
            "Participation re-queued"
        );

        self.get(&existing.id)
            .await?
            .ok_or_else(|| StoreError::not_found(format!("participation {}", existing.id)))
    }

    /// 按条件列出活动的参与记录（含参与者）
    pub async fn list(
        &self,
        event_id: &str,
        filter: &ParticipationFilter,
    ) -> Result<Vec<ParticipationRecord>> {
        let mut query = participation::Entity::find()
            .find_also_related(participant::Entity)
            .filter(participation::Column::EventId.eq(event_id));

        if let Some(status) = filter.generation_status {
            query = query.filter(participation::Column::GenerationStatus.eq(status.as_str()));
        }
        if let Some(status) = filter.delivery_status {
            query = query.filter(participation::Column::DeliveryStatus.eq(status.as_str()));
        }

        let rows = query
            .order_by_asc(participation::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        to_records(rows)
    }

    /// 待生成的记录
    pub async fn list_pending_generation(&self, event_id: &str) -> Result<Vec<ParticipationRecord>> {
        let filter = ParticipationFilter {
            generation_status: Some(GenerationStatus::Pending),
            delivery_status: None,
        };
        self.list(event_id, &filter).await
    }

    /// 可投递的记录：已生成且投递状态为 pending 或 failed
    pub async fn list_deliverable(&self, event_id: &str) -> Result<Vec<ParticipationRecord>> {
        let rows = participation::Entity::find()
            .find_also_related(participant::Entity)
            .filter(participation::Column::EventId.eq(event_id))
            .filter(
                participation::Column::GenerationStatus.eq(GenerationStatus::Generated.as_str()),
            )
            .filter(participation::Column::DeliveryStatus.is_in([
                DeliveryStatus::Pending.as_str(),
                DeliveryStatus::Failed.as_str(),
            ]))
            .order_by_asc(participation::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        to_records(rows)
    }

    /// 标记生成成功
    pub async fn mark_generated(
        &self,
        record: &EventParticipation,
        document_path: &str,
    ) -> Result<bool> {
        let result = participation::Entity::update_many()
            .col_expr(
                participation::Column::GenerationStatus,
                Expr::value(GenerationStatus::Generated.as_str()),
            )
            .col_expr(
                participation::Column::DocumentPath,
                Expr::value(Some(document_path.to_string())),
            )
            .col_expr(
                participation::Column::GenerationError,
                Expr::value(Option::<String>::None),
            )
            .col_expr(participation::Column::GeneratedAt, Expr::value(Some(Utc::now())))
            .filter(participation::Column::Id.eq(record.id.as_str()))
            .filter(participation::Column::CertificateId.eq(record.certificate_id.as_str()))
            .filter(participation::Column::GenerationStatus.eq(GenerationStatus::Pending.as_str()))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// 标记生成失败
    pub async fn mark_generation_failed(
        &self,
        record: &EventParticipation,
        error: &str,
    ) -> Result<bool> {
        let result = participation::Entity::update_many()
            .col_expr(
                participation::Column::GenerationStatus,
                Expr::value(GenerationStatus::Failed.as_str()),
            )
            .col_expr(
                participation::Column::DocumentPath,
                Expr::value(Option::<String>::None),
            )
            .col_expr(
                participation::Column::GenerationError,
                Expr::value(Some(error.to_string())),
            )
            .filter(participation::Column::Id.eq(record.id.as_str()))
            .filter(participation::Column::CertificateId.eq(record.certificate_id.as_str()))
            .filter(participation::Column::GenerationStatus.eq(GenerationStatus::Pending.as_str()))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// 将活动下所有 pending 记录标记为生成失败（模板不可用等配置错误）
    pub async fn fail_pending_generation(&self, event_id: &str, error: &str) -> Result<u64> {
        let result = participation::Entity::update_many()
            .col_expr(
                participation::Column::GenerationStatus,
                Expr::value(GenerationStatus::Failed.as_str()),
            )
            .col_expr(
                participation::Column::GenerationError,
                Expr::value(Some(error.to_string())),
            )
            .filter(participation::Column::EventId.eq(event_id))
            .filter(participation::Column::GenerationStatus.eq(GenerationStatus::Pending.as_str()))
            .exec(&*self.db)
            .await?;

        info!(
            event_id = %event_id,
            failed = result.rows_affected,
            "Pending participations marked as failed"
        );
        Ok(result.rows_affected)
    }

    /// 标记投递成功
    pub async fn mark_sent(&self, record: &EventParticipation, attempts: u32) -> Result<bool> {
        let result = participation::Entity::update_many()
            .col_expr(
                participation::Column::DeliveryStatus,
                Expr::value(DeliveryStatus::Sent.as_str()),
            )
            .col_expr(
                participation::Column::DeliveryError,
                Expr::value(Option::<String>::None),
            )
            .col_expr(participation::Column::DeliveryAttempts, Expr::value(attempts as i32))
            .col_expr(participation::Column::SentAt, Expr::value(Some(Utc::now())))
            .filter(participation::Column::Id.eq(record.id.as_str()))
            .filter(participation::Column::CertificateId.eq(record.certificate_id.as_str()))
            .filter(
                participation::Column::GenerationStatus.eq(GenerationStatus::Generated.as_str()),
            )
            .filter(participation::Column::DeliveryStatus.ne(DeliveryStatus::Sent.as_str()))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// 标记投递失败
    pub async fn mark_delivery_failed(
        &self,
        record: &EventParticipation,
        error: &str,
        attempts: u32,
    ) -> Result<bool> {
        let result = participation::Entity::update_many()
            .col_expr(
                participation::Column::DeliveryStatus,
                Expr::value(DeliveryStatus::Failed.as_str()),
            )
            .col_expr(
                participation::Column::DeliveryError,
                Expr::value(Some(error.to_string())),
            )
            .col_expr(participation::Column::DeliveryAttempts, Expr::value(attempts as i32))
            .filter(participation::Column::Id.eq(record.id.as_str()))
            .filter(participation::Column::CertificateId.eq(record.certificate_id.as_str()))
            .filter(
                participation::Column::GenerationStatus.eq(GenerationStatus::Generated.as_str()),
            )
            .filter(participation::Column::DeliveryStatus.ne(DeliveryStatus::Sent.as_str()))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// 生成失败的记录重新置为 pending（保留证书 ID）
    pub async fn reset_failed_generation(&self, event_id: &str) -> Result<u64> {
        let result = participation::Entity::update_many()
            .col_expr(
                participation::Column::GenerationStatus,
                Expr::value(GenerationStatus::Pending.as_str()),
            )
            .col_expr(
                participation::Column::GenerationError,
                Expr::value(Option::<String>::None),
            )
            .filter(participation::Column::EventId.eq(event_id))
            .filter(participation::Column::GenerationStatus.eq(GenerationStatus::Failed.as_str()))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected)
    }

    /// 活动下所有记录重置为 pending/pending，并各自分配新的证书 ID
    pub async fn reset_event(&self, event_id: &str) -> Result<u64> {
        let ids: Vec<String> = participation::Entity::find()
            .select_only()
            .column(participation::Column::Id)
            .filter(participation::Column::EventId.eq(event_id))
            .into_tuple()
            .all(&*self.db)
            .await?;

        let txn = self.db.begin().await?;
        for id in &ids {
            reset_columns(participation::Entity::update_many(), &new_certificate_id())
                .filter(participation::Column::Id.eq(id.as_str()))
                .exec(&txn)
                .await?;
        }
        txn.commit().await?;

        info!(event_id = %event_id, count = ids.len(), "Event participations reset");
        Ok(ids.len() as u64)
    }

    /// 按 (生成状态, 投递状态) 分组计数
    pub async fn count_by_status(
        &self,
        event_id: &str,
    ) -> Result<Vec<(GenerationStatus, DeliveryStatus, u64)>> {
        let rows: Vec<(String, String, i64)> = participation::Entity::find()
            .select_only()
            .column(participation::Column::GenerationStatus)
            .column(participation::Column::DeliveryStatus)
            .column_as(Expr::col(participation::Column::Id).count(), "count")
            .filter(participation::Column::EventId.eq(event_id))
            .group_by(participation::Column::GenerationStatus)
            .group_by(participation::Column::DeliveryStatus)
            .into_tuple()
            .all(&*self.db)
            .await?;

        rows.into_iter()
            .map(|(generation, delivery, count)| {
                let generation: GenerationStatus =
                    generation.parse().map_err(StoreError::InvalidState)?;
                let delivery: DeliveryStatus =
                    delivery.parse().map_err(StoreError::InvalidState)?;
                Ok((generation, delivery, count.max(0) as u64))
            })
            .collect()
    }
}

/// 重置全部生成与投递字段
fn reset_columns(
    update: UpdateMany<participation::Entity>,
    certificate_id: &str,
) -> UpdateMany<participation::Entity> {
    update
        .col_expr(
            participation::Column::CertificateId,
            Expr::value(certificate_id.to_string()),
        )
        .col_expr(
            participation::Column::GenerationStatus,
            Expr::value(GenerationStatus::Pending.as_str()),
        )
        .col_expr(
            participation::Column::DeliveryStatus,
            Expr::value(DeliveryStatus::Pending.as_str()),
        )
        .col_expr(
            participation::Column::DocumentPath,
            Expr::value(Option::<String>::None),
        )
        .col_expr(
            participation::Column::GenerationError,
            Expr::value(Option::<String>::None),
        )
        .col_expr(
            participation::Column::DeliveryError,
            Expr::value(Option::<String>::None),
        )
        .col_expr(participation::Column::DeliveryAttempts, Expr::value(0))
        .col_expr(
            participation::Column::GeneratedAt,
            Expr::value(Option::<DateTime<Utc>>::None),
        )
        .col_expr(
            participation::Column::SentAt,
            Expr::value(Option::<DateTime<Utc>>::None),
        )
}

fn to_records(
    rows: Vec<(participation::Model, Option<participant::Model>)>,
) -> Result<Vec<ParticipationRecord>> {
    rows.into_iter()
        .map(|(model, participant)| {
            let participant = participant.ok_or_else(|| {
                StoreError::invalid_state(format!(
                    "participation {} references a missing participant",
                    model.id
                ))
            })?;
            Ok(ParticipationRecord {
                participation: EventParticipation::try_from(model)?,
                participant: Participant::from(participant),
            })
        })
        .collect()
}
