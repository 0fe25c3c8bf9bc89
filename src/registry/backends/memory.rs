use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::errors::Result;
use crate::registry::{LinkStore, TrackingLink};

/// 纯内存存储，进程退出即丢失
#[derive(Default)]
pub struct MemoryLinkStore {
    links: DashMap<String, TrackingLink>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn insert_if_absent(&self, link: TrackingLink) -> Result<bool> {
        match self.links.entry(link.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(link);
                Ok(true)
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Option<TrackingLink>> {
        Ok(self.links.get(id).map(|entry| entry.value().clone()))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.links.len())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
