
use certflow_pipeline::{EventUpdate, PipelineError};
use certflow_types::{
    DeliveryStatus, FieldDescriptor, GenerationStatus, ParticipationFilter, Recipient,
};
use test_helpers::{create_event, create_harness, create_harness_with, fast_config, MockMailer};

fn recipients(names: &[&str]) -> Vec<Recipient> {
    names
        .iter()
        .map(|name| Recipient::new(*name, format!("{}@example.com", name.to_lowercase())))
        .collect()
}

/// 三条记录：生成 2 成功 1 失败，投递 1 成功 1 重试耗尽
#[tokio::test]
async fn test_generation_and_delivery_scenario() {
    let harness = create_harness().await;
    let event = create_event(&harness).await;
    let orchestrator = &harness.orchestrator;

    let summary = orchestrator
        .enqueue(&event.id, recipients(&["Alice", "Bob", "Carol"]))
        .await
        .unwrap();
    assert_eq!(summary.queued, 3);
    assert_eq!(summary.created, 3);

    harness.renderer.fail_for("Carol");
    let report = orchestrator.generation_worker().generate(&event.id).await.unwrap();
    assert_eq!(report.generated, 2);
    assert_eq!(report.failed, 1);

    let status = orchestrator.get_status(&event.id).await.unwrap();
    assert_eq!(status.total, 3);
    assert_eq!(status.generation.generated, 2);
    assert_eq!(status.generation.failed, 1);
    assert_eq!(status.generation.pending, 0);

    harness.mailer.fail_always("bob@example.com");
    let report = orchestrator.delivery_worker().deliver(&event.id).await.unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.sent, 1);
    assert_eq!(report.failed, 1);

    let status = orchestrator.get_status(&event.id).await.unwrap();
    assert_eq!(status.total, 3);
    assert_eq!(status.generation.generated, 2);
    assert_eq!(status.generation.failed, 1);
    assert_eq!(status.generation.pending, 0);
    assert_eq!(status.delivery.sent, 1);
    assert_eq!(status.delivery.failed, 1);
    assert_eq!(status.delivery.pending, 1);

    // 不变量：各轴计数之和等于总数
    assert_eq!(
        status.generation.generated + status.generation.failed + status.generation.pending,
        status.total
    );
    assert_eq!(
        status.delivery.sent + status.delivery.failed + status.delivery.pending,
        status.total
    );

    let failed = orchestrator
        .list_participations(
            &event.id,
            &ParticipationFilter {
                generation_status: Some(GenerationStatus::Failed),
                delivery_status: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].participant.name, "Carol");
    assert!(failed[0].participation.document_path.is_none());
    assert!(failed[0]
        .participation
        .generation_error
        .as_deref()
        .unwrap()
        .contains("simulated render failure"));
}

/// 重试耗尽：1 次初始 + 3 次重试，保留最后一次错误
#[tokio::test]
async fn test_delivery_retry_exhaustion() {
    let harness = create_harness().await;
    let event = create_event(&harness).await;
    let orchestrator = &harness.orchestrator;

    orchestrator
        .enqueue(&event.id, recipients(&["Bob"]))
        .await
        .unwrap();
    orchestrator.generation_worker().generate(&event.id).await.unwrap();

    harness.mailer.fail_always("bob@example.com");
    orchestrator.delivery_worker().deliver(&event.id).await.unwrap();

    assert_eq!(harness.mailer.attempts_for("bob@example.com"), 4);

    let records = orchestrator
        .list_participations(&event.id, &ParticipationFilter::default())
        .await
        .unwrap();
    let record = &records[0].participation;
    assert_eq!(record.delivery_status, DeliveryStatus::Failed);
    assert_eq!(record.delivery_attempts, 4);
    assert_eq!(
        record.delivery_error.as_deref(),
        Some("Transient transport error: connection reset on attempt 4")
    );
    assert!(record.sent_at.is_none());
}

/// 重试后成功：记录实际尝试次数
#[tokio::test]
async fn test_delivery_succeeds_after_retries() {
    let harness = create_harness().await;
    let event = create_event(&harness).await;
    let orchestrator = &harness.orchestrator;

    orchestrator
        .enqueue(&event.id, recipients(&["Dave"]))
        .await
        .unwrap();
    orchestrator.generation_worker().generate(&event.id).await.unwrap();

    harness.mailer.fail_times("dave@example.com", 2);
    let report = orchestrator.delivery_worker().deliver(&event.id).await.unwrap();
    assert_eq!(report.sent, 1);

    let records = orchestrator
        .list_participations(&event.id, &ParticipationFilter::default())
        .await
        .unwrap();
    let record = &records[0].participation;
    assert_eq!(record.delivery_status, DeliveryStatus::Sent);
    assert_eq!(record.delivery_attempts, 3);
    assert!(record.sent_at.is_some());
    assert!(record.delivery_error.is_none());

    // 已投递的记录不会再次被选中
    let report = orchestrator.delivery_worker().deliver(&event.id).await.unwrap();
    assert_eq!(report.total, 0);
    assert_eq!(harness.mailer.call_count(), 3);
}

/// 失败的投递可以单独重新触发，不需要重新渲染
#[tokio::test]
async fn test_failed_delivery_is_retried_without_rerender() {
    let harness = create_harness().await;
    let event = create_event(&harness).await;
    let orchestrator = &harness.orchestrator;

    orchestrator
        .enqueue(&event.id, recipients(&["Erin"]))
        .await
        .unwrap();
    orchestrator.generation_worker().generate(&event.id).await.unwrap();

    harness.mailer.fail_times("erin@example.com", 4);
    orchestrator.delivery_worker().deliver(&event.id).await.unwrap();
    let status = orchestrator.get_status(&event.id).await.unwrap();
    assert_eq!(status.delivery.failed, 1);

    let report = orchestrator.delivery_worker().deliver(&event.id).await.unwrap();
    assert_eq!(report.sent, 1);
    assert_eq!(harness.renderer.call_count(), 1);

    let status = orchestrator.get_status(&event.id).await.unwrap();
    assert_eq!(status.delivery.sent, 1);
    assert_eq!(status.delivery.failed, 0);
}

/// 重复生成不会重复调用渲染
#[tokio::test]
async fn test_idempotent_generation() {
    let harness = create_harness().await;
    let event = create_event(&harness).await;
    let orchestrator = &harness.orchestrator;

    orchestrator
        .enqueue(&event.id, recipients(&["Alice", "Bob", "Carol"]))
        .await
        .unwrap();

    orchestrator.generation_worker().generate(&event.id).await.unwrap();
    assert_eq!(harness.renderer.call_count(), 3);

    let first: Vec<_> = orchestrator
        .list_participations(&event.id, &ParticipationFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.participation.document_path.unwrap())
        .collect();

    let report = orchestrator.generation_worker().generate(&event.id).await.unwrap();
    assert_eq!(report.total, 0);
    assert_eq!(harness.renderer.call_count(), 3);

    let mut second: Vec<_> = orchestrator
        .list_participations(&event.id, &ParticipationFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.participation.document_path.unwrap())
        .collect();
    let mut first = first;
    first.sort();
    second.sort();
    assert_eq!(first, second);

    for path in &first {
        assert!(std::path::Path::new(path).exists());
    }
}

/// 输出文件已存在时跳过渲染
#[tokio::test]
async fn test_existing_document_skips_render() {
    let harness = create_harness().await;
    let event = create_event(&harness).await;
    let orchestrator = &harness.orchestrator;

    orchestrator
        .enqueue(&event.id, recipients(&["Alice"]))
        .await
        .unwrap();
    let records = orchestrator
        .list_participations(&event.id, &ParticipationFilter::default())
        .await
        .unwrap();
    let path = harness
        .documents
        .path_for(&records[0].participation, "Alice", "pdf");
    harness.documents.write(&path, b"already here").await.unwrap();

    let report = orchestrator.generation_worker().generate(&event.id).await.unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(harness.renderer.call_count(), 0);

    let status = orchestrator.get_status(&event.id).await.unwrap();
    assert_eq!(status.generation.generated, 1);
    assert_eq!(std::fs::read(&path).unwrap(), b"already here");
}

/// 一批中一条失败，其余照常完成
#[tokio::test]
async fn test_partial_failure_isolation() {
    let harness = create_harness().await;
    let event = create_event(&harness).await;
    let orchestrator = &harness.orchestrator;

    orchestrator
        .enqueue(&event.id, recipients(&["Alice", "Bob", "Carol", "Dave", "Erin"]))
        .await
        .unwrap();
    harness.renderer.fail_for("Dave");

    let report = orchestrator.generation_worker().generate(&event.id).await.unwrap();
    assert_eq!(report.generated, 4);
    assert_eq!(report.failed, 1);

    let status = orchestrator.get_status(&event.id).await.unwrap();
    assert_eq!(status.generation.generated, 4);
    assert_eq!(status.generation.failed, 1);
}

/// 多批次处理
#[tokio::test]
async fn test_generation_runs_in_batches() {
    let mut config = fast_config();
    config.generation_batch_size = 2;
    let harness = create_harness_with(MockMailer::new(), config).await;
    let event = create_event(&harness).await;
    let orchestrator = &harness.orchestrator;

    let names: Vec<String> = (1..=5).map(|i| format!("Person{}", i)).collect();
    let names: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
    orchestrator.enqueue(&event.id, recipients(&names)).await.unwrap();

    let report = orchestrator.generation_worker().generate(&event.id).await.unwrap();
    assert_eq!(report.total, 5);
    assert_eq!(report.generated, 5);
}

/// 重新入队：状态重置、换新证书 ID、旧文件保留
#[tokio::test]
async fn test_requeue_resets_state_and_orphans_file() {
    let harness = create_harness().await;
    let event = create_event(&harness).await;
    let orchestrator = &harness.orchestrator;

    orchestrator
        .enqueue(&event.id, recipients(&["Alice"]))
        .await
        .unwrap();
    orchestrator.generation_worker().generate(&event.id).await.unwrap();
    orchestrator.delivery_worker().deliver(&event.id).await.unwrap();

    let before = orchestrator
        .list_participations(&event.id, &ParticipationFilter::default())
        .await
        .unwrap()
        .remove(0)
        .participation;
    let old_path = before.document_path.clone().unwrap();
    assert_eq!(before.delivery_status, DeliveryStatus::Sent);

    let summary = orchestrator
        .enqueue(&event.id, recipients(&["Alice"]))
        .await
        .unwrap();
    assert_eq!(summary.requeued, 1);
    assert_eq!(summary.created, 0);

    let after = orchestrator
        .list_participations(&event.id, &ParticipationFilter::default())
        .await
        .unwrap()
        .remove(0)
        .participation;
    assert_eq!(after.id, before.id);
    assert_ne!(after.certificate_id, before.certificate_id);
    assert_eq!(after.generation_status, GenerationStatus::Pending);
    assert_eq!(after.delivery_status, DeliveryStatus::Pending);
    assert!(after.document_path.is_none());
    assert!(std::path::Path::new(&old_path).exists());

    // 重新生成得到新文件
    orchestrator.generation_worker().generate(&event.id).await.unwrap();
    let regenerated = orchestrator
        .list_participations(&event.id, &ParticipationFilter::default())
        .await
        .unwrap()
        .remove(0)
        .participation;
    let new_path = regenerated.document_path.unwrap();
    assert_ne!(new_path, old_path);
    assert!(new_path.contains(&after.certificate_id));
}

/// 模板不可用：全部 pending 标记失败，不调用渲染
#[tokio::test]
async fn test_missing_template_fails_all_pending() {
    let harness = create_harness().await;
    let event = create_event(&harness).await;
    let orchestrator = &harness.orchestrator;

    orchestrator
        .enqueue(&event.id, recipients(&["Alice", "Bob"]))
        .await
        .unwrap();
    harness.renderer.set_missing_template(true);

    let report = orchestrator.generation_worker().generate(&event.id).await.unwrap();
    assert_eq!(report.failed, 2);
    assert_eq!(harness.renderer.call_count(), 0);

    let records = orchestrator
        .list_participations(&event.id, &ParticipationFilter::default())
        .await
        .unwrap();
    for record in records {
        assert_eq!(record.participation.generation_status, GenerationStatus::Failed);
        assert!(record
            .participation
            .generation_error
            .unwrap()
            .contains("Template not found"));
    }
}

/// 生成失败的记录可以单独重试
#[tokio::test]
async fn test_retry_failed_generation() {
    let harness = create_harness().await;
    let event = create_event(&harness).await;
    let orchestrator = &harness.orchestrator;

    orchestrator
        .enqueue(&event.id, recipients(&["Alice", "Bob"]))
        .await
        .unwrap();
    harness.renderer.fail_for("Bob");
    orchestrator.generation_worker().generate(&event.id).await.unwrap();

    let failed_before = orchestrator
        .list_participations(
            &event.id,
            &ParticipationFilter {
                generation_status: Some(GenerationStatus::Failed),
                delivery_status: None,
            },
        )
        .await
        .unwrap()
        .remove(0)
        .participation;

    harness.renderer.recover();
    let reset = orchestrator.retry_failed_generation(&event.id).await.unwrap();
    assert_eq!(reset, 1);

    orchestrator.trigger_generation(&event.id).await.unwrap();

    let status = orchestrator.get_status(&event.id).await.unwrap();
    assert_eq!(status.generation.generated, 2);
    assert_eq!(harness.renderer.call_count(), 3);

    let record = orchestrator
        .list_participations(&event.id, &ParticipationFilter::default())
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.participation.id == failed_before.id)
        .unwrap()
        .participation;
    assert_eq!(record.certificate_id, failed_before.certificate_id);
}

/// 凭据缺失：所有可投递记录失败，不尝试发送
#[tokio::test]
async fn test_missing_credentials_fails_delivery_phase() {
    let harness = create_harness_with(MockMailer::unconfigured(), fast_config()).await;
    let event = create_event(&harness).await;
    let orchestrator = &harness.orchestrator;

    orchestrator
        .enqueue(&event.id, recipients(&["Alice", "Bob"]))
        .await
        .unwrap();
    orchestrator.generation_worker().generate(&event.id).await.unwrap();

    let report = orchestrator.delivery_worker().deliver(&event.id).await.unwrap();
    assert_eq!(report.failed, 2);
    assert_eq!(harness.mailer.call_count(), 0);

    let records = orchestrator
        .list_participations(&event.id, &ParticipationFilter::default())
        .await
        .unwrap();
    for record in records {
        assert_eq!(record.participation.delivery_status, DeliveryStatus::Failed);
        assert!(record
            .participation
            .delivery_error
            .unwrap()
            .starts_with("Missing email credentials"));
    }
}

/// 文档丢失：直接失败，不重试
#[tokio::test]
async fn test_missing_document_is_not_retried() {
    let harness = create_harness().await;
    let event = create_event(&harness).await;
    let orchestrator = &harness.orchestrator;

    orchestrator
        .enqueue(&event.id, recipients(&["Alice"]))
        .await
        .unwrap();
    orchestrator.generation_worker().generate(&event.id).await.unwrap();

    let record = orchestrator
        .list_participations(&event.id, &ParticipationFilter::default())
        .await
        .unwrap()
        .remove(0)
        .participation;
    std::fs::remove_file(record.document_path.as_deref().unwrap()).unwrap();

    orchestrator.delivery_worker().deliver(&event.id).await.unwrap();
    assert_eq!(harness.mailer.call_count(), 0);

    let record = orchestrator
        .list_participations(&event.id, &ParticipationFilter::default())
        .await
        .unwrap()
        .remove(0)
        .participation;
    assert_eq!(record.delivery_status, DeliveryStatus::Failed);
    assert!(record.delivery_error.unwrap().starts_with("document missing"));
    assert_eq!(record.delivery_attempts, 0);
}

/// 布局变更重置所有记录
#[tokio::test]
async fn test_layout_change_resets_participations() {
    let harness = create_harness().await;
    let event = create_event(&harness).await;
    let orchestrator = &harness.orchestrator;

    orchestrator
        .enqueue(&event.id, recipients(&["Alice", "Bob"]))
        .await
        .unwrap();
    orchestrator.generation_worker().generate(&event.id).await.unwrap();

    // 仅修改展示信息不重置
    let mut metadata = event.metadata.clone();
    metadata.organization = Some("Ferris Foundation".to_string());
    let updated = orchestrator
        .update_event(
            &event.id,
            EventUpdate {
                metadata: Some(metadata),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.reset, 0);

    let updated = orchestrator
        .update_event(
            &event.id,
            EventUpdate {
                fields: Some(vec![FieldDescriptor::new("f1", "name", 0.3, 0.3)]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.reset, 2);

    let status = orchestrator.get_status(&event.id).await.unwrap();
    assert_eq!(status.generation.pending, 2);
    assert_eq!(status.delivery.pending, 2);
}

/// 非法布局在创建时被拒绝
#[tokio::test]
async fn test_invalid_layout_rejected() {
    let harness = create_harness().await;
    let mut request = test_helpers::new_event("Bad Layout");
    request.fields = vec![FieldDescriptor::new("f1", "name", 1.5, 0.5)];

    let err = harness
        .orchestrator
        .create_event("owner-1", request)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Layout(_)));
}

#[tokio::test]
async fn test_unresolvable_template_rejected_on_create() {
    let harness = create_harness().await;
    harness.renderer.set_missing_template(true);

    let err = harness
        .orchestrator
        .create_event("owner-1", test_helpers::new_event("No Template"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Render(certflow_render::RenderError::TemplateNotFound(_))
    ));
}

/// 存储中的布局损坏时，逐条记录失败
#[tokio::test]
async fn test_malformed_stored_layout_fails_records() {
    let harness = create_harness().await;
    let mut event = create_event(&harness).await;
    event.field_layout = "{not json".to_string();
    harness.stores.events.update(event.clone()).await.unwrap();

    harness
        .orchestrator
        .enqueue(&event.id, recipients(&["Alice"]))
        .await
        .unwrap();
    let report = harness
        .orchestrator
        .generation_worker()
        .generate(&event.id)
        .await
        .unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(harness.renderer.call_count(), 0);
}

/// 删除活动级联删除记录
#[tokio::test]
async fn test_delete_event() {
    let harness = create_harness().await;
    let event = create_event(&harness).await;
    let orchestrator = &harness.orchestrator;

    orchestrator
        .enqueue(&event.id, recipients(&["Alice"]))
        .await
        .unwrap();

    let removed = orchestrator.delete_event(&event.id).await.unwrap();
    assert_eq!(removed, 1);

    let status = orchestrator.get_status(&event.id).await.unwrap();
    assert!(!status.found);
    assert_eq!(status.total, 0);

    let err = orchestrator.delete_event(&event.id).await.unwrap_err();
    assert!(matches!(err, PipelineError::EventNotFound(_)));
}

/// 含空邮箱的批次整体拒绝，不留下任何写入
#[tokio::test]
async fn test_rejected_enqueue_writes_nothing() {
    let harness = create_harness().await;
    let event = create_event(&harness).await;
    let orchestrator = &harness.orchestrator;

    let batch = vec![
        Recipient::new("Alice", "alice@example.com"),
        Recipient::new("Bob", "  "),
    ];
    let err = orchestrator.enqueue(&event.id, batch).await.unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)));

    let status = orchestrator.get_status(&event.id).await.unwrap();
    assert_eq!(status.total, 0);

    // 已有记录不会被重置
    orchestrator
        .enqueue(&event.id, recipients(&["Carol"]))
        .await
        .unwrap();
    let before = orchestrator
        .list_participations(&event.id, &ParticipationFilter::default())
        .await
        .unwrap();

    let batch = vec![
        Recipient::new("Carol", "carol@example.com"),
        Recipient::new("Dave", ""),
    ];
    assert!(orchestrator.enqueue(&event.id, batch).await.is_err());

    let after = orchestrator
        .list_participations(&event.id, &ParticipationFilter::default())
        .await
        .unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(
        after[0].participation.certificate_id,
        before[0].participation.certificate_id
    );
}

/// 未知活动：状态为 not found，触发不会报错
#[tokio::test]
async fn test_unknown_event() {
    let harness = create_harness().await;
    let orchestrator = &harness.orchestrator;

    let status = orchestrator.get_status("evt_missing").await.unwrap();
    assert!(!status.found);
    assert_eq!(status.total, 0);

    orchestrator.trigger_generation("evt_missing").await.unwrap();
    orchestrator.trigger_delivery("evt_missing").await.unwrap();

    let err = orchestrator
        .enqueue("evt_missing", recipients(&["Alice"]))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::EventNotFound(_)));
}

/// 所有者不匹配时视为未找到
#[tokio::test]
async fn test_status_scoped_to_owner() {
    let harness = create_harness().await;
    let event = create_event(&harness).await;

    let status = harness
        .orchestrator
        .get_status_for_owner(&event.id, "someone-else")
        .await
        .unwrap();
    assert!(!status.found);

    let status = harness
        .orchestrator
        .get_status_for_owner(&event.id, "owner-1")
        .await
        .unwrap();
    assert!(status.found);
}

/// 预览不修改存储
#[tokio::test]
async fn test_preview_does_not_touch_store() {
    let harness = create_harness().await;
    let event = create_event(&harness).await;

    let document = harness
        .orchestrator
        .preview(&event.id, &Recipient::new("Preview Person", "preview@example.com"))
        .await
        .unwrap();
    assert_eq!(document.bytes, b"certificate for Preview Person");

    let status = harness.orchestrator.get_status(&event.id).await.unwrap();
    assert_eq!(status.total, 0);
}
