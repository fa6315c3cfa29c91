//! In-process backend for tests and throwaway deployments

use async_trait::async_trait;
use std::sync::Mutex;

use super::{StoreError, VisitorStore};
use crate::record::VisitorRecord;

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<VisitorRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VisitorStore for MemoryStore {
    async fn append(&self, record: &VisitorRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record.clone());
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<VisitorRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_appends_in_order() {
        let store = MemoryStore::new();
        assert!(store.read_all().await.expect("read").is_empty());

        let a = VisitorRecord::new("1.1.1.1".to_string(), "a".to_string());
        let b = VisitorRecord::new("2.2.2.2".to_string(), "b".to_string());
        store.append(&a).await.expect("append");
        store.append(&b).await.expect("append");

        assert_eq!(store.read_all().await.expect("read"), vec![a, b]);
    }
}
