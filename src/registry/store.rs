use async_trait::async_trait;

use super::TrackingLink;
use crate::errors::Result;

/// 链接存储后端
///
/// 所有实现必须保证 `insert_if_absent` 是原子的：并发插入同一 ID 时只有一个成功，
/// 且读取方永远看不到写了一半的记录。
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// 仅当 ID 不存在时插入，返回是否插入成功
    async fn insert_if_absent(&self, link: TrackingLink) -> Result<bool>;

    async fn get(&self, id: &str) -> Result<Option<TrackingLink>>;

    async fn count(&self) -> Result<usize>;

    /// 后端名称（用于日志和健康检查）
    fn backend_name(&self) -> &'static str;
}
