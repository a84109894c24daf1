use crate::config::{BrandingConfig, PipelineConfig};
use crate::data::render_data;
use crate::documents::DocumentStore;
use crate::error::{PipelineError, Result};
use certflow_render::Renderer;
use certflow_store::{EventRepository, ParticipationRecord, ParticipationRepository};
use certflow_types::{layout, Event, Recipient};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// 一次生成任务的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// 本次快照中的 pending 记录数
    pub total: usize,
    pub generated: usize,
    /// 输出文件已存在，未调用渲染
    pub skipped: usize,
    pub failed: usize,
    /// 写回时证书 ID 已变更（被重新入队）
    pub stale: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Generated,
    Skipped,
    Failed,
    Stale,
}

/// 生成任务
pub struct GenerationWorker {
    events: Arc<EventRepository>,
    participations: Arc<ParticipationRepository>,
    renderer: Arc<dyn Renderer>,
    documents: DocumentStore,
    config: PipelineConfig,
    branding: BrandingConfig,
}

impl GenerationWorker {
    pub fn new(
        events: Arc<EventRepository>,
        participations: Arc<ParticipationRepository>,
        renderer: Arc<dyn Renderer>,
        documents: DocumentStore,
        config: PipelineConfig,
        branding: BrandingConfig,
    ) -> Self {
        Self {
            events,
            participations,
            renderer,
            documents,
            config,
            branding,
        }
    }

    /// 为活动生成所有 pending 记录的文档
    ///
    /// 可重复调用：只处理调用时刻处于 pending 的记录，输出文件已存在的记录不再渲染。
    pub async fn generate(&self, event_id: &str) -> Result<GenerationReport> {
        let started = Instant::now();
        let event = self
            .events
            .get(event_id)
            .await?
            .ok_or_else(|| PipelineError::EventNotFound(event_id.to_string()))?;

        // 模板不可用时整批失败，不做部分渲染
        if let Err(e) = self.renderer.check_template(&event.template_ref).await {
            let message = e.to_string();
            let failed = self
                .participations
                .fail_pending_generation(event_id, &message)
                .await?;
            error!(
                event_id = %event_id,
                template = %event.template_ref,
                failed,
                error = %message,
                "Template unresolvable, generation aborted"
            );
            return Ok(GenerationReport {
                total: failed as usize,
                failed: failed as usize,
                ..Default::default()
            });
        }

        let records = self.participations.list_pending_generation(event_id).await?;
        let mut report = GenerationReport {
            total: records.len(),
            ..Default::default()
        };

        if records.is_empty() {
            info!(event_id = %event_id, "No pending participations to generate");
            return Ok(report);
        }

        let batch_size = self.config.generation_batch_size.max(1);
        let batch_count = (records.len() + batch_size - 1) / batch_size;
        info!(
            event_id = %event_id,
            total = records.len(),
            batch_size,
            batches = batch_count,
            "Starting certificate generation"
        );

        for (index, batch) in records.chunks(batch_size).enumerate() {
            debug!(event_id = %event_id, batch = index + 1, size = batch.len(), "Processing generation batch");

            let outcomes = join_all(batch.iter().map(|record| self.process(&event, record))).await;
            for outcome in outcomes {
                match outcome {
                    Outcome::Generated => report.generated += 1,
                    Outcome::Skipped => report.skipped += 1,
                    Outcome::Failed => report.failed += 1,
                    Outcome::Stale => report.stale += 1,
                }
            }

            if index + 1 < batch_count {
                tokio::time::sleep(self.config.generation_batch_delay()).await;
            }
        }

        info!(
            event_id = %event_id,
            total = report.total,
            generated = report.generated,
            skipped = report.skipped,
            failed = report.failed,
            duration_ms = started.elapsed().as_millis() as u64,
            "Certificate generation completed"
        );

        Ok(report)
    }

    async fn process(&self, event: &Event, record: &ParticipationRecord) -> Outcome {
        match self.try_process(event, record).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // 存储写入失败，记录保持 pending，下次调用会再处理
                error!(
                    event_id = %event.id,
                    certificate_id = %record.participation.certificate_id,
                    error = %e,
                    "Failed to record generation outcome"
                );
                Outcome::Failed
            }
        }
    }

    async fn try_process(&self, event: &Event, record: &ParticipationRecord) -> Result<Outcome> {
        let participation = &record.participation;
        let path = self.documents.path_for(
            participation,
            &record.participant.name,
            self.renderer.document_extension(),
        );
        let path_str = path.to_string_lossy().to_string();

        if self.documents.exists(&path).await {
            debug!(
                certificate_id = %participation.certificate_id,
                path = %path_str,
                "Document already exists, skipping render"
            );
            let applied = self.participations.mark_generated(participation, &path_str).await?;
            return Ok(if applied { Outcome::Skipped } else { Outcome::Stale });
        }

        let rendered = match layout::parse(&event.field_layout) {
            Ok(fields) => {
                let recipient = Recipient::from(&record.participant);
                let data = render_data(event, &recipient, &self.branding, self.config.merge_precedence);
                self.renderer
                    .render(&data, &event.template_ref, &fields)
                    .await
                    .map_err(PipelineError::from)
            }
            Err(e) => Err(PipelineError::from(e)),
        };

        let written = match rendered {
            Ok(document) => self
                .documents
                .write(&path, &document.bytes)
                .await
                .map_err(PipelineError::from),
            Err(e) => Err(e),
        };

        match written {
            Ok(()) => {
                let applied = self.participations.mark_generated(participation, &path_str).await?;
                if !applied {
                    return Ok(Outcome::Stale);
                }
                debug!(
                    certificate_id = %participation.certificate_id,
                    path = %path_str,
                    "Certificate generated"
                );
                Ok(Outcome::Generated)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(
                    event_id = %event.id,
                    certificate_id = %participation.certificate_id,
                    error = %message,
                    "Certificate generation failed"
                );
                let applied = self
                    .participations
                    .mark_generation_failed(participation, &message)
                    .await?;
                Ok(if applied { Outcome::Failed } else { Outcome::Stale })
            }
        }
    }
}
