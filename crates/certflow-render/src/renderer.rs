use crate::compose::compose_page;
use crate::engine::EngineHandle;
use crate::error::Result;
use crate::template::TemplateStore;
use async_trait::async_trait;
use certflow_types::FieldDescriptor;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// 渲染产物
#[derive(Debug, Clone)]
pub struct Document {
    pub bytes: Vec<u8>,
    pub extension: String,
}

/// 渲染协作方
///
/// 同样的输入可以重复调用，实现需要支持按批大小并发调用。
#[async_trait]
pub trait Renderer: Send + Sync {
    /// 产出文档的扩展名，用于在渲染前确定输出路径
    fn document_extension(&self) -> &str;

    /// 检查模板是否可解析
    async fn check_template(&self, template_ref: &str) -> Result<()>;

    /// 渲染单个文档
    async fn render(
        &self,
        data: &Map<String, Value>,
        template_ref: &str,
        layout: &[FieldDescriptor],
    ) -> Result<Document>;
}

/// 基于页面组合 + 引擎句柄的渲染器
pub struct PageRenderer {
    templates: TemplateStore,
    engine: Arc<EngineHandle>,
}

impl PageRenderer {
    pub fn new(templates: TemplateStore, engine: Arc<EngineHandle>) -> Self {
        Self { templates, engine }
    }

    pub fn engine(&self) -> &Arc<EngineHandle> {
        &self.engine
    }
}

#[async_trait]
impl Renderer for PageRenderer {
    fn document_extension(&self) -> &str {
        self.engine.extension()
    }

    async fn check_template(&self, template_ref: &str) -> Result<()> {
        self.templates.load(template_ref).await.map(|_| ())
    }

    async fn render(
        &self,
        data: &Map<String, Value>,
        template_ref: &str,
        layout: &[FieldDescriptor],
    ) -> Result<Document> {
        let template = self.templates.load(template_ref).await?;
        let html = compose_page(&template, layout, data);

        let lease = self.engine.acquire().await?;
        let bytes = lease
            .render_page(&html, template.width(), template.height())
            .await?;

        debug!(
            template = %template.path.display(),
            fields = layout.len(),
            size = bytes.len(),
            "Document rendered"
        );

        Ok(Document {
            bytes,
            extension: self.engine.extension().to_string(),
        })
    }
}
