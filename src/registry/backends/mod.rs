mod file;
mod memory;

pub use file::FileLinkStore;
pub use memory::MemoryLinkStore;

use std::sync::Arc;

use tracing::info;

use super::LinkStore;
use crate::config::RegistryConfig;
use crate::errors::{Result, TracelinkError};

/// 根据配置创建存储后端
pub async fn create_store(config: &RegistryConfig) -> Result<Arc<dyn LinkStore>> {
    let store: Arc<dyn LinkStore> = match config.store.to_lowercase().as_str() {
        "memory" => Arc::new(MemoryLinkStore::new()),
        "file" => Arc::new(FileLinkStore::open(&config.path).await?),
        other => {
            return Err(TracelinkError::config(format!(
                "Unknown registry store '{}'. Valid: memory, file",
                other
            )));
        }
    };
    info!("Link registry using {} store", store.backend_name());
    Ok(store)
}
