//! 链接注册表
//!
//! 负责签发追踪 ID 并把 ID 解析回目标 URL。注册表是进程内唯一跨访问共享的状态，
//! 通过 `Arc<LinkRegistry>` 注入到签发和解析的处理器中。

pub mod backends;
mod store;

pub use backends::{FileLinkStore, MemoryLinkStore, create_store};
pub use store::LinkStore;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::errors::{Result, TracelinkError};
use crate::utils::{generate_link_id, is_valid_link_id, validate_url};

/// 签发 ID 时的最大重试次数
///
/// 128 bit 随机 ID 实际上不会碰撞，连续碰撞说明 ID 生成器本身有问题
const MAX_ISSUE_ATTEMPTS: usize = 8;

/// 已签发的追踪链接，创建后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingLink {
    pub id: String,
    pub destination_url: String,
    pub created_at: DateTime<Utc>,
}

type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

pub struct LinkRegistry {
    store: Arc<dyn LinkStore>,
    link_prefix: String,
    id_generator: IdGenerator,
}

impl LinkRegistry {
    pub fn new(store: Arc<dyn LinkStore>, link_prefix: impl Into<String>) -> Self {
        Self {
            store,
            link_prefix: link_prefix.into().trim_end_matches('/').to_string(),
            id_generator: Arc::new(generate_link_id),
        }
    }

    /// 纯内存注册表（测试和 CLI 预览用）
    pub fn in_memory(link_prefix: impl Into<String>) -> Self {
        Self::new(Arc::new(MemoryLinkStore::new()), link_prefix)
    }

    /// 替换 ID 生成器（用于测试碰撞重试）
    pub fn with_id_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.id_generator = Arc::new(generator);
        self
    }

    /// 签发新的追踪链接
    ///
    /// 目标 URL 无效时返回 `InvalidDestination`，不会写入任何记录。
    /// ID 碰撞时重新生成，绝不覆盖已有映射。
    pub async fn issue(&self, destination_url: &str) -> Result<TrackingLink> {
        if let Err(e) = validate_url(destination_url) {
            debug!("Rejected destination {:?}: {}", destination_url, e);
            return Err(e.into());
        }
        let destination_url = destination_url.trim().to_string();

        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let link = TrackingLink {
                id: (self.id_generator)(),
                destination_url: destination_url.clone(),
                created_at: Utc::now(),
            };

            if self.store.insert_if_absent(link.clone()).await? {
                info!("Issued link {} -> {}", link.id, link.destination_url);
                return Ok(link);
            }
            warn!(
                "Link id collision on attempt {}/{}: {}",
                attempt, MAX_ISSUE_ATTEMPTS, link.id
            );
        }

        Err(TracelinkError::storage(format!(
            "Failed to allocate a unique link id after {} attempts",
            MAX_ISSUE_ATTEMPTS
        )))
    }

    /// 查找完整链接记录
    pub async fn lookup(&self, id: &str) -> Result<TrackingLink> {
        if !is_valid_link_id(id) {
            trace!("Invalid link id rejected: {:?}", id);
            return Err(TracelinkError::unknown_link(format!("Unknown link: {}", id)));
        }

        match self.store.get(id).await? {
            Some(link) => Ok(link),
            None => {
                debug!("Link not found: {}", id);
                Err(TracelinkError::unknown_link(format!("Unknown link: {}", id)))
            }
        }
    }

    /// 解析 ID 得到目标 URL
    pub async fn resolve(&self, id: &str) -> Result<String> {
        self.lookup(id).await.map(|link| link.destination_url)
    }

    /// 构建可分享的追踪链接
    pub fn link_url(&self, id: &str) -> String {
        format!("{}/track/{}", self.link_prefix, id)
    }

    pub async fn count(&self) -> Result<usize> {
        self.store.count().await
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }
}
