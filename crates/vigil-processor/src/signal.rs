use std::future::Future;

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::queue::StopHandle;

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
pub async fn wait_for_shutdown() -> ShutdownSignal {
    use signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Failed to install signal handlers, falling back to Ctrl+C: {}", e);
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM");
            ShutdownSignal::Term
        }
        _ = sigint.recv() => {
            info!("Received SIGINT");
            ShutdownSignal::Interrupt
        }
    }
}

/// 等待系统关闭信号（非 unix 平台）
#[cfg(not(unix))]
pub async fn wait_for_shutdown() -> ShutdownSignal {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> ShutdownSignal {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C");
    ShutdownSignal::Interrupt
}

/// 信号到达后向处理器发送停止指令
pub fn stop_on<F>(shutdown: F, handle: StopHandle) -> JoinHandle<()>
where
    F: Future<Output = ShutdownSignal> + Send + 'static,
{
    tokio::spawn(async move {
        let signal = shutdown.await;
        info!(signal = ?signal, "Shutting down processor");
        if let Err(e) = handle.stop().await {
            error!("Failed to request stop: {}", e);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::EventQueue;
    use std::sync::Arc;
    use vigil_core::{MemoryStore, SharedStore};

    #[tokio::test]
    async fn test_stop_on_signal() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let queue = EventQueue::new(store, "events");

        stop_on(async { ShutdownSignal::Term }, queue.stop_handle())
            .await
            .unwrap();

        assert_eq!(queue.wait_for_action().await.unwrap(), "stop");
    }
}
