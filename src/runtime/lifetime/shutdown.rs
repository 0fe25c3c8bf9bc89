use tokio::signal;
use tracing::{info, warn};

/// 等待 Ctrl+C，收到后返回让服务器优雅退出
///
/// 已派发的上报请求不会被等待，它们随进程一起结束。
pub async fn listen_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, stopping server...");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }
}
