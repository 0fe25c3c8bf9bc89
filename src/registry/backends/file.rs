use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::errors::{Result, TracelinkError};
use crate::registry::{LinkStore, TrackingLink};

/// JSON Lines 文件存储
///
/// 启动时回放整个文件到内存索引，之后每次插入追加一行。
/// 链接创建后不可变，所以追加写即可，无需重写文件。
///
/// 插入在写锁内完成：先落盘，成功后才进入内存索引，
/// 失败的写入会被截断回写入前的长度。
pub struct FileLinkStore {
    path: PathBuf,
    links: DashMap<String, TrackingLink>,
    /// 串行化文件追加，避免多行交错
    writer: Mutex<File>,
    /// 截断失败后文件尾部状态未知，拒绝后续写入
    failed: AtomicBool,
    #[cfg(test)]
    fail_after: parking_lot::Mutex<Option<usize>>,
}

impl FileLinkStore {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let links = DashMap::new();
        // 文件中最后一个完整行的结束位置
        let mut intact_len = None;

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                for (line_no, line) in content.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<TrackingLink>(line) {
                        Ok(link) => {
                            // 重复 ID 以第一次写入为准
                            links.entry(link.id.clone()).or_insert(link);
                        }
                        Err(e) => warn!(
                            "Skipping malformed line {} in {}: {}",
                            line_no + 1,
                            path.display(),
                            e
                        ),
                    }
                }
                if !content.is_empty() && !content.ends_with('\n') {
                    intact_len = Some(content.rfind('\n').map_or(0, |i| i + 1) as u64);
                }
                info!("Loaded {} links from {}", links.len(), path.display());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Link file {} not found, starting empty", path.display());
            }
            Err(e) => {
                return Err(TracelinkError::storage(format!(
                    "Failed to read link file {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                TracelinkError::storage(format!(
                    "Failed to open link file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        if let Some(len) = intact_len {
            // 上次进程在写入中途退出，丢弃残缺的尾行，否则下一行会拼接在它后面
            warn!(
                "Truncating torn trailing line in {} to {} bytes",
                path.display(),
                len
            );
            file.set_len(len).await.map_err(|e| {
                TracelinkError::storage(format!(
                    "Failed to truncate link file {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }

        Ok(Self {
            path,
            links,
            writer: Mutex::new(file),
            failed: AtomicBool::new(false),
            #[cfg(test)]
            fail_after: parking_lot::Mutex::new(None),
        })
    }

    #[cfg(test)]
    fn injected_fault(&self) -> Option<usize> {
        self.fail_after.lock().take()
    }

    #[cfg(not(test))]
    fn injected_fault(&self) -> Option<usize> {
        None
    }

    async fn write_line(&self, file: &mut File, line: &[u8]) -> std::io::Result<()> {
        if let Some(written) = self.injected_fault() {
            file.write_all(&line[..written.min(line.len())]).await?;
            file.flush().await?;
            return Err(std::io::Error::other("write interrupted"));
        }
        file.write_all(line).await?;
        file.flush().await
    }

    /// 截断回写入前的长度；截断也失败时把存储标记为不可写
    async fn rollback(&self, file: &mut File, committed_len: u64) {
        if let Err(e) = file.set_len(committed_len).await {
            error!(
                "Failed to roll back partial write in {}: {}, refusing further inserts",
                self.path.display(),
                e
            );
            self.failed.store(true, Ordering::Release);
        }
    }

    fn persist_error(&self, e: impl std::fmt::Display) -> TracelinkError {
        TracelinkError::storage(format!(
            "Failed to persist link to {}: {}",
            self.path.display(),
            e
        ))
    }
}

#[async_trait]
impl LinkStore for FileLinkStore {
    async fn insert_if_absent(&self, link: TrackingLink) -> Result<bool> {
        let mut line = serde_json::to_string(&link)?;
        line.push('\n');

        // 检查、落盘、入索引都在写锁内，并发插入同一 ID 时只有一个成功
        let mut file = self.writer.lock().await;
        if self.failed.load(Ordering::Acquire) {
            return Err(TracelinkError::storage(format!(
                "Link file {} is in a failed state",
                self.path.display()
            )));
        }
        if self.links.contains_key(&link.id) {
            return Ok(false);
        }

        let committed_len = file
            .metadata()
            .await
            .map_err(|e| self.persist_error(e))?
            .len();
        if let Err(e) = self.write_line(&mut file, line.as_bytes()).await {
            self.rollback(&mut file, committed_len).await;
            return Err(self.persist_error(e));
        }

        debug!("Persisted link {} to {}", link.id, self.path.display());
        self.links.insert(link.id.clone(), link);
        Ok(true)
    }

    async fn get(&self, id: &str) -> Result<Option<TrackingLink>> {
        Ok(self.links.get(id).map(|entry| entry.value().clone()))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.links.len())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
