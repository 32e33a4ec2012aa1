use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{DataAccessError, DataAccessResult};
use crate::object::{ObjectMeta, ObjectStore};

#[derive(Debug, Clone)]
struct StoredObject {
    meta: ObjectMeta,
    data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    buckets: RwLock<HashMap<String, BTreeMap<String, StoredObject>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(bucket: &str, name: &str) -> DataAccessError {
    DataAccessError::NotFound(format!("gs://{}/{}", bucket, name))
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        bucket: &str,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> DataAccessResult<ObjectMeta> {
        if name.is_empty() {
            return Err(DataAccessError::InvalidInput("object name cannot be empty".to_string()));
        }
        let meta = ObjectMeta {
            bucket: bucket.to_string(),
            name: name.to_string(),
            size: data.len(),
            content_type: content_type.to_string(),
            updated: Utc::now(),
        };
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default()
            .insert(name.to_string(), StoredObject { meta: meta.clone(), data });
        tracing::debug!(bucket, name, size = meta.size, "对象已写入");
        Ok(meta)
    }

    async fn get(&self, bucket: &str, name: &str) -> DataAccessResult<Vec<u8>> {
        self.buckets
            .read()
            .await
            .get(bucket)
            .and_then(|objects| objects.get(name))
            .map(|obj| obj.data.clone())
            .ok_or_else(|| not_found(bucket, name))
    }

    async fn metadata(&self, bucket: &str, name: &str) -> DataAccessResult<ObjectMeta> {
        self.buckets
            .read()
            .await
            .get(bucket)
            .and_then(|objects| objects.get(name))
            .map(|obj| obj.meta.clone())
            .ok_or_else(|| not_found(bucket, name))
    }

    async fn exists(&self, bucket: &str, name: &str) -> DataAccessResult<bool> {
        Ok(self
            .buckets
            .read()
            .await
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(name)))
    }

    async fn delete(&self, bucket: &str, name: &str) -> DataAccessResult<()> {
        self.buckets
            .write()
            .await
            .get_mut(bucket)
            .and_then(|objects| objects.remove(name))
            .map(|_| ())
            .ok_or_else(|| not_found(bucket, name))
    }

    async fn list(&self, bucket: &str, prefix: &str) -> DataAccessResult<Vec<ObjectMeta>> {
        Ok(self
            .buckets
            .read()
            .await
            .get(bucket)
            .map(|objects| {
                objects
                    .range(prefix.to_string()..)
                    .take_while(|(name, _)| name.starts_with(prefix))
                    .map(|(_, obj)| obj.meta.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip_keeps_metadata() {
        let store = InMemoryObjectStore::new();
        let meta = store
            .put("rag-docs", "raw/contract.txt", b"hello".to_vec(), "text/plain")
            .await
            .unwrap();

        assert_eq!(meta.size, 5);
        assert_eq!(store.get("rag-docs", "raw/contract.txt").await.unwrap(), b"hello");
        assert_eq!(store.metadata("rag-docs", "raw/contract.txt").await.unwrap(), meta);
    }

    #[tokio::test]
    async fn test_list_by_prefix_is_sorted() {
        let store = InMemoryObjectStore::new();
        for name in ["raw/b.txt", "processed/a.json", "raw/a.txt", "rawness.txt"] {
            store.put("rag-docs", name, vec![], "text/plain").await.unwrap();
        }

        let names: Vec<String> = store
            .list("rag-docs", "raw/")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, ["raw/a.txt", "raw/b.txt"]);
        assert_eq!(store.list("rag-docs", "").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_get_fresh_within_max_age() {
        let store = InMemoryObjectStore::new();
        store.put("rag-docs", "page.html", b"<html/>".to_vec(), "text/html").await.unwrap();

        let data = store
            .get_fresh("rag-docs", "page.html", Duration::from_secs(1000))
            .await
            .unwrap();
        assert_eq!(data, b"<html/>");
    }

    #[tokio::test]
    async fn test_get_fresh_rejects_stale_object() {
        let store = InMemoryObjectStore::new();
        store.put("rag-docs", "page.html", b"<html/>".to_vec(), "text/html").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = store
            .get_fresh("rag-docs", "page.html", Duration::from_millis(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DataAccessError::Expired(ref msg) if msg.contains("gs://rag-docs/page.html")));

        // 重新写入后即视为新鲜
        store.put("rag-docs", "page.html", b"<html></html>".to_vec(), "text/html").await.unwrap();
        assert!(store.get_fresh("rag-docs", "page.html", Duration::from_secs(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_fresh_missing_is_not_found() {
        let store = InMemoryObjectStore::new();
        let result = store.get_fresh("rag-docs", "nope", Duration::from_secs(1)).await;
        assert!(matches!(result, Err(DataAccessError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let store = InMemoryObjectStore::new();
        store.put("b", "x", vec![1], "application/octet-stream").await.unwrap();

        store.delete("b", "x").await.unwrap();
        assert!(!store.exists("b", "x").await.unwrap());
        assert!(matches!(store.delete("b", "x").await, Err(DataAccessError::NotFound(_))));
        assert!(matches!(store.get("b", "x").await, Err(DataAccessError::NotFound(_))));
    }
}
