use anyhow::{Context, Result};
use axum::Router;
use certflow_api::{create_router, AppState};
use certflow_config::AppConfig;
use certflow_notify::{Mailer, SmtpMailer};
use certflow_pipeline::{DocumentStore, Orchestrator};
use certflow_render::{EngineHandle, HtmlEngineLauncher, PageRenderer, TemplateStore};
use certflow_store::{connect, setup_schema, Stores};
use std::sync::Arc;
use tracing::{info, warn};

/// 装配完成的服务
pub struct Application {
    pub config: AppConfig,
    pub router: Router,
    pub orchestrator: Arc<Orchestrator>,
    /// 关闭时需要显式释放
    pub engine: Arc<EngineHandle>,
}

/// 根据配置装配所有组件
pub async fn build(config: AppConfig) -> Result<Application> {
    tokio::fs::create_dir_all(&config.storage.templates_dir)
        .await
        .with_context(|| format!("creating {}", config.storage.templates_dir.display()))?;
    tokio::fs::create_dir_all(&config.storage.documents_dir)
        .await
        .with_context(|| format!("creating {}", config.storage.documents_dir.display()))?;

    let db = connect(&config.database.url).await?;
    setup_schema(&db).await?;
    let stores = Stores::new(Arc::new(db));

    // 引擎并发与生成批大小一致
    let engine = Arc::new(EngineHandle::new(
        Arc::new(HtmlEngineLauncher),
        config.pipeline.generation_batch_size,
    ));
    let renderer = Arc::new(PageRenderer::new(
        TemplateStore::new(&config.storage.templates_dir),
        engine.clone(),
    ));

    let mailer = SmtpMailer::new(config.smtp.clone())?;
    if let Err(e) = mailer.check_configured() {
        warn!(error = %e, "SMTP is not configured, deliveries will fail");
    }

    let orchestrator = Arc::new(Orchestrator::new(
        stores,
        renderer,
        Arc::new(mailer),
        DocumentStore::new(&config.storage.documents_dir),
        config.pipeline.clone(),
        config.branding.clone(),
    ));

    let router = create_router(AppState::new(orchestrator.clone()));

    info!(
        templates_dir = %config.storage.templates_dir.display(),
        documents_dir = %config.storage.documents_dir.display(),
        "Application ready"
    );

    Ok(Application {
        config,
        router,
        orchestrator,
        engine,
    })
}
