use tokio::signal;
use tracing::{info, warn};

/// 关闭信号类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGTERM
    Term,

    /// SIGINT - Ctrl+C
    Interrupt,
}

/// 等待系统关闭信号
#[cfg(unix)]
pub async fn wait_for_signal() -> ShutdownSignal {
    use signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler");
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM");
            ShutdownSignal::Term
        }
        received = wait_for_ctrl_c() => received,
    }
}

/// 等待系统关闭信号（Windows 版本）
#[cfg(not(unix))]
pub async fn wait_for_signal() -> ShutdownSignal {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> ShutdownSignal {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received SIGINT");
            ShutdownSignal::Interrupt
        }
        Err(e) => {
            // 无法监听时只能等待其他信号
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending().await
        }
    }
}
