//! 延时跳转
//!
//! 访问开始时启动一次性定时器，到期后导航到目标地址。跳转与上报是否完成无关；
//! 访问被提前销毁时定时器被清除，不会向已卸载的页面回调。

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// 宿主提供的导航能力
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

/// 把导航目标发送到 channel 的导航器（无界面宿主使用）
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, url: &str) {
        if self.tx.send(url.to_string()).is_err() {
            trace!("ChannelNavigator: receiver dropped, navigation to {} ignored", url);
        }
    }
}

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// 跳转状态，只能从 PENDING 迁移一次：触发和取消互斥
struct RedirectState(AtomicU8);

impl RedirectState {
    fn new() -> Self {
        Self(AtomicU8::new(PENDING))
    }

    fn settle(&self, next: u8) -> bool {
        self.0
            .compare_exchange(PENDING, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn get(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }
}

/// 已调度的跳转；drop 时自动取消
pub struct ScheduledRedirect {
    state: Arc<RedirectState>,
    handle: JoinHandle<()>,
}

pub struct RedirectScheduler;

impl RedirectScheduler {
    /// 在 `dwell` 之后导航到 `destination`，最多触发一次
    pub fn schedule(
        navigator: Arc<dyn Navigator>,
        destination: impl Into<String>,
        dwell: Duration,
    ) -> ScheduledRedirect {
        let destination = destination.into();
        let state = Arc::new(RedirectState::new());
        let task_state = Arc::clone(&state);

        debug!("Redirect to {} scheduled in {:?}", destination, dwell);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(dwell).await;

            if task_state.settle(FIRED) {
                debug!("Dwell elapsed, navigating to {}", destination);
                navigator.navigate(&destination);
            } else {
                trace!("Redirect to {} cancelled before firing", destination);
            }
        });

        ScheduledRedirect { state, handle }
    }
}

impl ScheduledRedirect {
    /// 取消跳转，返回是否在触发前取消成功
    ///
    /// 返回 true 时保证导航不会发生；已触发时返回 false
    pub fn cancel(&self) -> bool {
        let cancelled = self.state.settle(CANCELLED);
        if cancelled {
            self.handle.abort();
        }
        cancelled
    }

    pub fn has_fired(&self) -> bool {
        self.state.get() == FIRED
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.get() == CANCELLED
    }
}

impl Drop for ScheduledRedirect {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tokio::time::{Instant, advance};

    #[derive(Default)]
    struct RecordingNavigator {
        visits: Mutex<Vec<(String, Instant)>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, url: &str) {
            self.visits.lock().push((url.to_string(), Instant::now()));
        }
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_at_dwell() {
        let navigator = Arc::new(RecordingNavigator::default());
        let start = Instant::now();
        let redirect = RedirectScheduler::schedule(
            navigator.clone(),
            "https://example.com",
            Duration::from_millis(3000),
        );
        // 让定时任务先运行一次，注册 sleep
        settle().await;

        advance(Duration::from_millis(2999)).await;
        settle().await;
        assert!(navigator.visits.lock().is_empty());
        assert!(!redirect.has_fired());

        advance(Duration::from_millis(1)).await;
        settle().await;
        {
            let visits = navigator.visits.lock();
            assert_eq!(visits.len(), 1);
            assert_eq!(visits[0].0, "https://example.com");
            assert!(visits[0].1 - start >= Duration::from_millis(3000));
        }
        assert!(redirect.has_fired());

        advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(navigator.visits.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_fire() {
        let navigator = Arc::new(RecordingNavigator::default());
        let redirect = RedirectScheduler::schedule(
            navigator.clone(),
            "https://example.com",
            Duration::from_millis(3000),
        );
        // 让定时任务先运行一次，注册 sleep
        settle().await;

        advance(Duration::from_millis(1000)).await;
        assert!(redirect.cancel());
        assert!(redirect.is_cancelled());

        advance(Duration::from_secs(5)).await;
        settle().await;
        assert!(navigator.visits.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let navigator = Arc::new(RecordingNavigator::default());
        drop(RedirectScheduler::schedule(
            navigator.clone(),
            "https://example.com",
            Duration::from_millis(100),
        ));

        advance(Duration::from_secs(1)).await;
        settle().await;
        assert!(navigator.visits.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_fire_reports_false() {
        let navigator = Arc::new(RecordingNavigator::default());
        let redirect = RedirectScheduler::schedule(
            navigator.clone(),
            "https://example.com",
            Duration::from_millis(10),
        );
        settle().await;

        advance(Duration::from_millis(10)).await;
        settle().await;
        assert!(redirect.has_fired());
        assert!(!redirect.cancel());
        assert!(!redirect.is_cancelled());
        assert_eq!(navigator.visits.lock().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_successful_cancel_never_navigates() {
        for _ in 0..2000 {
            let navigator = Arc::new(RecordingNavigator::default());
            let redirect =
                RedirectScheduler::schedule(navigator.clone(), "https://example.com", Duration::ZERO);
            tokio::task::yield_now().await;

            let cancelled = redirect.cancel();
            // 等任务结束（被中止或已导航）
            let handle_done = tokio::time::timeout(Duration::from_secs(1), async {
                while !redirect.handle.is_finished() {
                    tokio::task::yield_now().await;
                }
            })
            .await;
            assert!(handle_done.is_ok());

            let visits = navigator.visits.lock().len();
            if cancelled {
                assert_eq!(visits, 0);
                assert!(redirect.is_cancelled());
            } else {
                assert_eq!(visits, 1);
                assert!(redirect.has_fired());
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_navigator() {
        let (navigator, mut rx) = ChannelNavigator::new();
        let _redirect = RedirectScheduler::schedule(
            Arc::new(navigator),
            "https://example.org",
            Duration::from_millis(50),
        );
        assert_eq!(rx.recv().await.as_deref(), Some("https://example.org"));
    }
}
