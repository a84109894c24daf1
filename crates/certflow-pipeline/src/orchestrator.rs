use crate::config::{BrandingConfig, PipelineConfig};
use crate::data::render_data;
use crate::delivery::DeliveryWorker;
use crate::documents::DocumentStore;
use crate::error::{PipelineError, Result};
use crate::generation::GenerationWorker;
use crate::status::StatusAggregator;
use certflow_notify::Mailer;
use certflow_render::{Document, Renderer};
use certflow_store::{ParticipationRecord, Stores};
use certflow_types::{layout, Event, EventMetadata, EventStatus, FieldDescriptor, ParticipationFilter, Recipient};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 新建活动参数
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub template_ref: String,
    pub fields: Vec<FieldDescriptor>,
    pub metadata: EventMetadata,
}

/// 活动更新参数，None 表示不修改
#[derive(Debug, Clone, Default)]
pub struct EventUpdate {
    pub template_ref: Option<String>,
    pub fields: Option<Vec<FieldDescriptor>>,
    pub metadata: Option<EventMetadata>,
}

/// 更新结果
#[derive(Debug, Clone, Serialize)]
pub struct EventUpdated {
    pub event: Event,
    /// 因模板或布局变更被重置的记录数
    pub reset: u64,
}

/// 入队结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnqueueSummary {
    pub queued: usize,
    pub created: usize,
    pub requeued: usize,
}

/// 流水线入口
///
/// 触发类操作立即返回，任务在后台运行，进度通过 [`Orchestrator::get_status`] 查询。
pub struct Orchestrator {
    stores: Stores,
    renderer: Arc<dyn Renderer>,
    generation: Arc<GenerationWorker>,
    delivery: Arc<DeliveryWorker>,
    status: StatusAggregator,
    config: PipelineConfig,
    branding: BrandingConfig,
}

impl Orchestrator {
    pub fn new(
        stores: Stores,
        renderer: Arc<dyn Renderer>,
        mailer: Arc<dyn Mailer>,
        documents: DocumentStore,
        config: PipelineConfig,
        branding: BrandingConfig,
    ) -> Self {
        let generation = Arc::new(GenerationWorker::new(
            stores.events.clone(),
            stores.participations.clone(),
            renderer.clone(),
            documents,
            config.clone(),
            branding.clone(),
        ));
        let delivery = Arc::new(DeliveryWorker::new(
            stores.events.clone(),
            stores.participations.clone(),
            mailer,
            config.clone(),
            branding.clone(),
        ));
        let status = StatusAggregator::new(stores.events.clone(), stores.participations.clone());

        Self {
            stores,
            renderer,
            generation,
            delivery,
            status,
            config,
            branding,
        }
    }

    pub fn generation_worker(&self) -> &Arc<GenerationWorker> {
        &self.generation
    }

    pub fn delivery_worker(&self) -> &Arc<DeliveryWorker> {
        &self.delivery
    }

    // ========== 活动管理 ==========

    pub async fn create_event(&self, owner_id: &str, new_event: NewEvent) -> Result<Event> {
        if new_event.template_ref.trim().is_empty() {
            return Err(PipelineError::InvalidInput("template reference is required".to_string()));
        }
        if new_event.metadata.name.trim().is_empty() {
            return Err(PipelineError::InvalidInput("event name is required".to_string()));
        }
        layout::validate(&new_event.fields)?;
        self.renderer.check_template(&new_event.template_ref).await?;

        let event = Event::new(
            owner_id,
            new_event.template_ref,
            layout::to_json(&new_event.fields),
            new_event.metadata,
        );
        Ok(self.stores.events.insert(event).await?)
    }

    pub async fn get_event(&self, event_id: &str) -> Result<Event> {
        self.stores
            .events
            .get(event_id)
            .await?
            .ok_or_else(|| PipelineError::EventNotFound(event_id.to_string()))
    }

    /// 更新活动；模板或布局变化时所有记录重置为 pending 并换新证书 ID
    pub async fn update_event(&self, event_id: &str, update: EventUpdate) -> Result<EventUpdated> {
        let current = self.get_event(event_id).await?;
        let mut next = current.clone();

        if let Some(template_ref) = update.template_ref {
            if template_ref.trim().is_empty() {
                return Err(PipelineError::InvalidInput("template reference is required".to_string()));
            }
            self.renderer.check_template(&template_ref).await?;
            next.template_ref = template_ref;
        }
        if let Some(fields) = update.fields {
            layout::validate(&fields)?;
            next.field_layout = layout::to_json(&fields);
        }
        if let Some(metadata) = update.metadata {
            if metadata.name.trim().is_empty() {
                return Err(PipelineError::InvalidInput("event name is required".to_string()));
            }
            next.metadata = metadata;
        }

        let rerender = current.needs_rerender(&next);
        let event = self.stores.events.update(next).await?;

        let reset = if rerender {
            let reset = self.stores.participations.reset_event(event_id).await?;
            info!(event_id = %event_id, reset, "Template or layout changed, participations reset");
            reset
        } else {
            0
        };

        Ok(EventUpdated { event, reset })
    }

    /// 删除活动及其参与记录，已生成的文件保留在磁盘上
    pub async fn delete_event(&self, event_id: &str) -> Result<u64> {
        match self.stores.events.delete(event_id).await {
            Ok(removed) => Ok(removed),
            Err(certflow_store::StoreError::NotFound(_)) => {
                Err(PipelineError::EventNotFound(event_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    // ========== 流水线 ==========

    /// 入队收件人：已有记录重置为 pending/pending 并分配新证书 ID，旧文件不删除
    pub async fn enqueue(&self, event_id: &str, recipients: Vec<Recipient>) -> Result<EnqueueSummary> {
        let event = self.get_event(event_id).await?;

        // 整批校验通过后才写入
        let recipients = recipients
            .into_iter()
            .map(|recipient| {
                let email = recipient.email.trim().to_string();
                if email.is_empty() {
                    return Err(PipelineError::InvalidInput(format!(
                        "recipient '{}' has no email address",
                        recipient.name
                    )));
                }
                Ok(Recipient { email, ..recipient })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut summary = EnqueueSummary::default();
        for recipient in recipients {
            let participant = self
                .stores
                .participants
                .find_or_create(&event.owner_id, recipient)
                .await?;
            let (_, created) = self
                .stores
                .participations
                .upsert_pending(event_id, &participant.id)
                .await?;

            summary.queued += 1;
            if created {
                summary.created += 1;
            } else {
                summary.requeued += 1;
            }
        }

        info!(
            event_id = %event_id,
            queued = summary.queued,
            created = summary.created,
            requeued = summary.requeued,
            "Recipients enqueued"
        );
        Ok(summary)
    }

    /// 后台触发生成，错误只记录日志
    pub fn trigger_generation(&self, event_id: &str) -> JoinHandle<()> {
        let worker = self.generation.clone();
        let event_id = event_id.to_string();

        tokio::spawn(async move {
            if let Err(e) = worker.generate(&event_id).await {
                error!(event_id = %event_id, error = %e, "Generation job failed");
            }
        })
    }

    /// 后台触发投递，错误只记录日志
    pub fn trigger_delivery(&self, event_id: &str) -> JoinHandle<()> {
        let worker = self.delivery.clone();
        let event_id = event_id.to_string();

        tokio::spawn(async move {
            if let Err(e) = worker.deliver(&event_id).await {
                error!(event_id = %event_id, error = %e, "Delivery job failed");
            }
        })
    }

    /// 生成失败的记录重新置为 pending，证书 ID 不变
    pub async fn retry_failed_generation(&self, event_id: &str) -> Result<u64> {
        self.get_event(event_id).await?;
        let reset = self
            .stores
            .participations
            .reset_failed_generation(event_id)
            .await?;

        info!(event_id = %event_id, reset, "Failed generations re-queued");
        Ok(reset)
    }

    pub async fn get_status(&self, event_id: &str) -> Result<EventStatus> {
        self.status.get_status(event_id).await
    }

    pub async fn get_status_for_owner(&self, event_id: &str, owner_id: &str) -> Result<EventStatus> {
        self.status.get_status_for_owner(event_id, owner_id).await
    }

    pub async fn list_participations(
        &self,
        event_id: &str,
        filter: &ParticipationFilter,
    ) -> Result<Vec<ParticipationRecord>> {
        self.get_event(event_id).await?;
        Ok(self.stores.participations.list(event_id, filter).await?)
    }

    /// 为临时收件人渲染一份文档，不写存储
    pub async fn preview(&self, event_id: &str, recipient: &Recipient) -> Result<Document> {
        let event = self.get_event(event_id).await?;
        let fields = layout::parse(&event.field_layout)?;
        let data = render_data(&event, recipient, &self.branding, self.config.merge_precedence);

        Ok(self
            .renderer
            .render(&data, &event.template_ref, &fields)
            .await?)
    }
}
