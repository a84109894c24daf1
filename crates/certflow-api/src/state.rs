use certflow_pipeline::Orchestrator;
use std::sync::Arc;

/// API 应用状态
#[derive(Clone)]
pub struct AppState {
    /// 流水线入口
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}
