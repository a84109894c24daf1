use crate::config::{BrandingConfig, PipelineConfig};
use crate::data::delivery_metadata;
use crate::error::{PipelineError, Result};
use certflow_notify::{DeliveryError, DeliveryErrorKind, DeliveryMetadata, MailRecipient, Mailer};
use certflow_store::{EventRepository, ParticipationRecord, ParticipationRepository};
use futures::future::join_all;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// 一次投递任务的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub stale: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Sent,
    Failed,
    Stale,
}

/// 投递任务
pub struct DeliveryWorker {
    events: Arc<EventRepository>,
    participations: Arc<ParticipationRepository>,
    mailer: Arc<dyn Mailer>,
    config: PipelineConfig,
    branding: BrandingConfig,
}

impl DeliveryWorker {
    pub fn new(
        events: Arc<EventRepository>,
        participations: Arc<ParticipationRepository>,
        mailer: Arc<dyn Mailer>,
        config: PipelineConfig,
        branding: BrandingConfig,
    ) -> Self {
        Self {
            events,
            participations,
            mailer,
            config,
            branding,
        }
    }

    /// 投递活动下所有已生成、未成功投递的文档
    ///
    /// 之前投递失败的记录也会被重新选中。
    pub async fn deliver(&self, event_id: &str) -> Result<DeliveryReport> {
        let started = Instant::now();
        let event = self
            .events
            .get(event_id)
            .await?
            .ok_or_else(|| PipelineError::EventNotFound(event_id.to_string()))?;

        let records = self.participations.list_deliverable(event_id).await?;
        let mut report = DeliveryReport {
            total: records.len(),
            ..Default::default()
        };

        if records.is_empty() {
            info!(event_id = %event_id, "No deliverable participations");
            return Ok(report);
        }

        // 凭据缺失时整批失败
        if let Err(e) = self.mailer.check_configured() {
            let message = e.to_string();
            for record in &records {
                if self
                    .participations
                    .mark_delivery_failed(&record.participation, &message, 0)
                    .await?
                {
                    report.failed += 1;
                } else {
                    report.stale += 1;
                }
            }
            error!(
                event_id = %event_id,
                mailer = %self.mailer.name(),
                failed = report.failed,
                error = %message,
                "Mail transport not configured, delivery aborted"
            );
            return Ok(report);
        }

        let metadata = delivery_metadata(&event, &self.branding);
        let batch_size = self.config.delivery_batch_size.max(1);
        let batch_count = (records.len() + batch_size - 1) / batch_size;

        info!(
            event_id = %event_id,
            total = records.len(),
            batch_size,
            mailer = %self.mailer.name(),
            "Starting certificate delivery"
        );

        for (index, batch) in records.chunks(batch_size).enumerate() {
            let outcomes = join_all(batch.iter().map(|record| self.process(record, &metadata))).await;
            for outcome in outcomes {
                match outcome {
                    Outcome::Sent => report.sent += 1,
                    Outcome::Failed => report.failed += 1,
                    Outcome::Stale => report.stale += 1,
                }
            }

            if index + 1 < batch_count {
                tokio::time::sleep(self.config.delivery_item_delay()).await;
            }
        }

        info!(
            event_id = %event_id,
            total = report.total,
            sent = report.sent,
            failed = report.failed,
            duration_ms = started.elapsed().as_millis() as u64,
            "Certificate delivery completed"
        );

        Ok(report)
    }

    async fn process(&self, record: &ParticipationRecord, metadata: &DeliveryMetadata) -> Outcome {
        match self.try_process(record, metadata).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    certificate_id = %record.participation.certificate_id,
                    error = %e,
                    "Failed to record delivery outcome"
                );
                Outcome::Failed
            }
        }
    }

    async fn try_process(
        &self,
        record: &ParticipationRecord,
        metadata: &DeliveryMetadata,
    ) -> Result<Outcome> {
        let participation = &record.participation;

        let path = participation.document_path.as_deref().unwrap_or_default();
        let exists = !path.is_empty() && tokio::fs::try_exists(path).await.unwrap_or(false);
        if !exists {
            let message = format!("document missing: {}", path);
            warn!(
                certificate_id = %participation.certificate_id,
                error = %message,
                "Rendered document missing, delivery not attempted"
            );
            let applied = self
                .participations
                .mark_delivery_failed(participation, &message, 0)
                .await?;
            return Ok(if applied { Outcome::Failed } else { Outcome::Stale });
        }

        let recipient = MailRecipient {
            name: record.participant.name.clone(),
            email: record.participant.email.clone(),
            certificate_id: participation.certificate_id.clone(),
        };

        match self.send_with_retry(&recipient, Path::new(path), metadata).await {
            Ok(attempts) => {
                let applied = self.participations.mark_sent(participation, attempts).await?;
                if applied {
                    debug!(
                        certificate_id = %participation.certificate_id,
                        email = %recipient.email,
                        attempts,
                        "Certificate delivered"
                    );
                }
                Ok(if applied { Outcome::Sent } else { Outcome::Stale })
            }
            Err((e, attempts)) => {
                warn!(
                    certificate_id = %participation.certificate_id,
                    email = %recipient.email,
                    attempts,
                    kind = e.kind().as_str(),
                    error = %e,
                    "Certificate delivery failed"
                );
                let applied = self
                    .participations
                    .mark_delivery_failed(participation, &e.to_string(), attempts)
                    .await?;
                Ok(if applied { Outcome::Failed } else { Outcome::Stale })
            }
        }
    }

    /// 带指数退避的投递，返回成功时的尝试次数，或最后一次错误及尝试次数
    async fn send_with_retry(
        &self,
        recipient: &MailRecipient,
        path: &Path,
        metadata: &DeliveryMetadata,
    ) -> std::result::Result<u32, (DeliveryError, u32)> {
        let max_attempts = self.config.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match self.mailer.send(recipient, path, metadata).await {
                Ok(()) => return Ok(attempt),
                Err(e) => e,
            };

            // 附件消失无法通过重试修复
            if attempt >= max_attempts || error.kind() == DeliveryErrorKind::AttachmentMissing {
                return Err((error, attempt));
            }

            let delay = self.config.backoff_delay(attempt - 1);
            warn!(
                email = %recipient.email,
                attempt,
                retry_in_ms = delay.as_millis() as u64,
                error = %error,
                "Delivery attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
