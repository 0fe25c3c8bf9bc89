//! 交互事件捕获
//!
//! 一组具名事件源（指针移动、点击、可见性变化）把事件发布到访问独占的
//! `EventBuffer`。缓冲区有上限，满后淘汰最旧的事件。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use strum::AsRefStr;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum EventKind {
    #[serde(alias = "mousemove")]
    Move,
    Click,
    #[serde(alias = "visibility")]
    VisibilityChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityState {
    Visible,
    Hidden,
}

/// 单条交互事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEvent {
    #[serde(alias = "type")]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, alias = "visible", skip_serializing_if = "Option::is_none")]
    pub visibility_state: Option<VisibilityState>,
    #[serde(alias = "time")]
    pub timestamp_ms: i64,
}

impl InteractionEvent {
    pub fn pointer_move(x: f64, y: f64, timestamp_ms: i64) -> Self {
        Self {
            kind: EventKind::Move,
            x: Some(x),
            y: Some(y),
            visibility_state: None,
            timestamp_ms,
        }
    }

    pub fn click(x: f64, y: f64, timestamp_ms: i64) -> Self {
        Self {
            kind: EventKind::Click,
            x: Some(x),
            y: Some(y),
            visibility_state: None,
            timestamp_ms,
        }
    }

    pub fn visibility(state: VisibilityState, timestamp_ms: i64) -> Self {
        Self {
            kind: EventKind::VisibilityChange,
            x: None,
            y: None,
            visibility_state: Some(state),
            timestamp_ms,
        }
    }
}

/// 有界、只追加的事件缓冲区
///
/// `record` 在锁内追加，顺序即到达顺序；`drain` 返回快照但不清空，
/// 因为每次访问只上报一次。关闭后拒绝新事件。
pub struct EventBuffer {
    events: Mutex<VecDeque<InteractionEvent>>,
    capacity: usize,
    closed: AtomicBool,
    /// 因容量上限被淘汰的事件数
    dropped: AtomicU64,
}

impl EventBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        }
    }

    /// 追加事件，返回是否被接收（关闭后返回 false）
    pub fn record(&self, event: InteractionEvent) -> bool {
        // 关闭标志在锁内检查，与 close() 互斥
        let mut events = self.events.lock();
        if self.closed.load(Ordering::Acquire) {
            trace!("EventBuffer: closed, dropping {} event", event.kind.as_ref());
            return false;
        }

        if events.len() == self.capacity {
            events.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        events.push_back(event);
        true
    }

    /// 按发生顺序返回当前累积的事件（不清空）
    pub fn drain(&self) -> Vec<InteractionEvent> {
        self.events.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// 关闭缓冲区，只有第一次调用返回 true
    ///
    /// 持有事件锁时设置标志，返回后不会再有事件写入
    pub fn close(&self) -> bool {
        let _events = self.events.lock();
        !self.closed.swap(true, Ordering::AcqRel)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// 具名事件源，宿主的事件监听器通过它发布事件
#[derive(Clone)]
pub struct EventSource {
    name: &'static str,
    buffer: Arc<EventBuffer>,
}

impl EventSource {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 发布事件；监听器已注销时返回 false
    pub fn publish(&self, event: InteractionEvent) -> bool {
        self.buffer.record(event)
    }
}

/// 一次访问注册的全部事件源
#[derive(Clone)]
pub struct EventSources {
    pub pointer: EventSource,
    pub click: EventSource,
    pub visibility: EventSource,
}

/// 监听器生命周期管理
///
/// 注册和注销都只发生一次：重复注册返回已有的事件源，重复注销无效果。
pub struct EventCapture {
    buffer: Arc<EventBuffer>,
    sources: OnceLock<EventSources>,
    torn_down: AtomicBool,
}

impl EventCapture {
    pub fn new(buffer: Arc<EventBuffer>) -> Self {
        Self {
            buffer,
            sources: OnceLock::new(),
            torn_down: AtomicBool::new(false),
        }
    }

    pub fn register(&self) -> EventSources {
        self.sources
            .get_or_init(|| {
                debug!("EventCapture: registering pointer, click and visibility sources");
                let source = |name| EventSource {
                    name,
                    buffer: Arc::clone(&self.buffer),
                };
                EventSources {
                    pointer: source("pointer"),
                    click: source("click"),
                    visibility: source("visibility"),
                }
            })
            .clone()
    }

    pub fn is_registered(&self) -> bool {
        self.sources.get().is_some()
    }

    /// 注销监听器，之后任何事件源的发布都会被拒绝
    ///
    /// 只有真正执行注销的那次调用返回 true
    pub fn teardown(&self) -> bool {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.buffer.close();
        debug!(
            "EventCapture: listeners removed, {} events captured, {} dropped",
            self.buffer.len(),
            self.buffer.dropped()
        );
        true
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    pub fn buffer(&self) -> &Arc<EventBuffer> {
        &self.buffer
    }
}
