use crate::error::{RenderError, Result};
use async_trait::async_trait;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

/// 渲染引擎实例
///
/// 接收组合好的 HTML 页面，输出最终文档字节。
#[async_trait]
pub trait Engine: Send + Sync {
    /// 将页面渲染为文档
    async fn render_page(&self, html: &str, width: u32, height: u32) -> Result<Vec<u8>>;

    /// 实例是否仍可用
    fn is_connected(&self) -> bool;

    /// 关闭实例
    async fn close(&self) -> Result<()>;
}

/// 引擎启动器
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn Engine>>;

    /// 引擎产出文档的扩展名
    fn extension(&self) -> &str;
}

/// 引擎句柄
///
/// 最多持有一个存活的引擎实例：首次 acquire 时启动，连接正常时复用，
/// 实例断开后下一次 acquire 重新启动。并发租约数由信号量限制，租约释放时归还许可。
pub struct EngineHandle {
    launcher: Arc<dyn EngineLauncher>,
    current: Mutex<Option<Arc<dyn Engine>>>,
    permits: Arc<Semaphore>,
    closed: AtomicBool,
    launches: AtomicU64,
}

impl EngineHandle {
    pub fn new(launcher: Arc<dyn EngineLauncher>, max_concurrency: usize) -> Self {
        Self {
            launcher,
            current: Mutex::new(None),
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            closed: AtomicBool::new(false),
            launches: AtomicU64::new(0),
        }
    }

    pub fn extension(&self) -> &str {
        self.launcher.extension()
    }

    /// 已启动的实例数
    pub fn launch_count(&self) -> u64 {
        self.launches.load(Ordering::Relaxed)
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 获取引擎租约
    pub async fn acquire(&self) -> Result<EngineLease> {
        if self.is_shut_down() {
            return Err(RenderError::engine("engine handle has been shut down"));
        }

        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| RenderError::engine("engine handle has been shut down"))?;

        let mut current = self.current.lock().await;

        if let Some(engine) = current.as_ref() {
            if engine.is_connected() {
                debug!("Reusing engine instance");
                return Ok(EngineLease {
                    engine: engine.clone(),
                    _permit: permit,
                });
            }
            warn!("Engine instance disconnected, relaunching");
            *current = None;
        }

        info!("Launching engine instance");
        let engine = self.launcher.launch().await?;
        self.launches.fetch_add(1, Ordering::Relaxed);
        *current = Some(engine.clone());

        Ok(EngineLease {
            engine,
            _permit: permit,
        })
    }

    /// 关闭句柄，之后的 acquire 全部失败
    pub async fn shutdown(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.permits.close();

        let engine = self.current.lock().await.take();
        if let Some(engine) = engine {
            info!("Closing engine instance");
            engine.close().await?;
        }

        Ok(())
    }
}

/// 引擎租约，drop 时释放并发许可
pub struct EngineLease {
    engine: Arc<dyn Engine>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for EngineLease {
    type Target = dyn Engine;

    fn deref(&self) -> &Self::Target {
        &*self.engine
    }
}

/// 内置 HTML 引擎：直接输出组合好的页面
pub struct HtmlEngine {
    connected: AtomicBool,
}

impl HtmlEngine {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
        }
    }
}

impl Default for HtmlEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Engine for HtmlEngine {
    async fn render_page(&self, html: &str, _width: u32, _height: u32) -> Result<Vec<u8>> {
        if !self.is_connected() {
            return Err(RenderError::engine("engine instance is closed"));
        }
        Ok(html.as_bytes().to_vec())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn close(&self) -> Result<()> {
        self.connected.store(false, Ordering::Release);
        Ok(())
    }
}

/// 内置 HTML 引擎启动器
#[derive(Debug, Default)]
pub struct HtmlEngineLauncher;

#[async_trait]
impl EngineLauncher for HtmlEngineLauncher {
    async fn launch(&self) -> Result<Arc<dyn Engine>> {
        let engine: Arc<dyn Engine> = Arc::new(HtmlEngine::new());
        Ok(engine)
    }

    fn extension(&self) -> &str {
        "html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// 记录启动的实例，便于模拟断开
    #[derive(Default)]
    struct TrackingLauncher {
        launched: std::sync::Mutex<Vec<Arc<HtmlEngine>>>,
    }

    impl TrackingLauncher {
        fn last(&self) -> Arc<HtmlEngine> {
            self.launched.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl EngineLauncher for TrackingLauncher {
        async fn launch(&self) -> Result<Arc<dyn Engine>> {
            let engine = Arc::new(HtmlEngine::new());
            self.launched.lock().unwrap().push(engine.clone());
            Ok(engine as Arc<dyn Engine>)
        }

        fn extension(&self) -> &str {
            "html"
        }
    }

    #[tokio::test]
    async fn test_lazy_launch_and_reuse() {
        let handle = EngineHandle::new(Arc::new(HtmlEngineLauncher), 2);
        assert_eq!(handle.launch_count(), 0);

        {
            let lease = handle.acquire().await.unwrap();
            let bytes = lease.render_page("<p>hi</p>", 10, 10).await.unwrap();
            assert_eq!(bytes, b"<p>hi</p>");
        }
        let _lease = handle.acquire().await.unwrap();

        assert_eq!(handle.launch_count(), 1);
        assert_eq!(handle.extension(), "html");
    }

    #[tokio::test]
    async fn test_relaunch_after_disconnect() {
        let launcher = Arc::new(TrackingLauncher::default());
        let handle = EngineHandle::new(launcher.clone(), 1);

        drop(handle.acquire().await.unwrap());
        launcher.last().close().await.unwrap();

        let lease = handle.acquire().await.unwrap();
        assert!(lease.is_connected());
        assert_eq!(handle.launch_count(), 2);
    }

    #[tokio::test]
    async fn test_leases_are_bounded() {
        let handle = Arc::new(EngineHandle::new(Arc::new(HtmlEngineLauncher), 1));

        let first = handle.acquire().await.unwrap();
        let blocked = tokio::time::timeout(Duration::from_millis(50), handle.acquire()).await;
        assert!(blocked.is_err());

        drop(first);
        let second = tokio::time::timeout(Duration::from_millis(500), handle.acquire()).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_closes_engine() {
        let launcher = Arc::new(TrackingLauncher::default());
        let handle = EngineHandle::new(launcher.clone(), 2);

        drop(handle.acquire().await.unwrap());
        handle.shutdown().await.unwrap();

        assert!(!launcher.last().is_connected());
        assert!(handle.is_shut_down());
        assert!(handle.acquire().await.is_err());
        // 重复关闭无副作用
        handle.shutdown().await.unwrap();
    }
}
