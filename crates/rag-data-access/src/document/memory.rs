use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use crate::document::{DocumentStore, ListOptions};
use crate::error::{DataAccessError, DataAccessResult};
use crate::filter::lookup;

type Collections = HashMap<String, BTreeMap<String, JsonValue>>;

/// 进程内文档库，未指定排序时 list 按 id 排序返回
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<Collections>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn ensure_object(collection: &str, id: &str, doc: &JsonValue) -> DataAccessResult<()> {
    if doc.is_object() {
        Ok(())
    } else {
        Err(DataAccessError::InvalidInput(format!(
            "document {}/{} must be a JSON object",
            collection, id
        )))
    }
}

fn not_found(collection: &str, id: &str) -> DataAccessError {
    DataAccessError::NotFound(format!("{}/{}", collection, id))
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create(&self, collection: &str, id: &str, doc: JsonValue) -> DataAccessResult<()> {
        ensure_object(collection, id, &doc)?;
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Err(DataAccessError::AlreadyExists(format!("{}/{}", collection, id)));
        }
        docs.insert(id.to_string(), doc);
        tracing::debug!(collection, id, "文档已创建");
        Ok(())
    }

    async fn set(&self, collection: &str, id: &str, doc: JsonValue) -> DataAccessResult<()> {
        ensure_object(collection, id, &doc)?;
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> DataAccessResult<JsonValue> {
        self.collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
            .ok_or_else(|| not_found(collection, id))
    }

    async fn exists(&self, collection: &str, id: &str) -> DataAccessResult<bool> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .is_some_and(|docs| docs.contains_key(id)))
    }

    async fn update(&self, collection: &str, id: &str, fields: JsonValue) -> DataAccessResult<JsonValue> {
        let JsonValue::Object(fields) = fields else {
            return Err(DataAccessError::InvalidInput(
                "update fields must be a JSON object".to_string(),
            ));
        };

        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| not_found(collection, id))?;
        if let JsonValue::Object(existing) = doc {
            existing.extend(fields);
        }
        Ok(doc.clone())
    }

    async fn delete(&self, collection: &str, id: &str) -> DataAccessResult<bool> {
        let removed = self
            .collections
            .write()
            .await
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        tracing::debug!(collection, id, removed, "删除文档");
        Ok(removed)
    }

    async fn delete_cascade(&self, collection: &str, id: &str) -> DataAccessResult<bool> {
        let prefix = format!("{}/{}/", collection, id);
        let mut collections = self.collections.write().await;
        let removed = collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        let before = collections.len();
        collections.retain(|name, _| !name.starts_with(&prefix));
        tracing::debug!(collection, id, removed, subcollections = before - collections.len(), "级联删除文档");
        Ok(removed)
    }

    async fn delete_all(&self, collection: &str) -> DataAccessResult<usize> {
        let removed = self
            .collections
            .write()
            .await
            .get_mut(collection)
            .map(|docs| std::mem::take(docs).len())
            .unwrap_or(0);
        tracing::debug!(collection, removed, "清空集合");
        Ok(removed)
    }

    async fn list(&self, collection: &str, options: &ListOptions) -> DataAccessResult<Vec<JsonValue>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map(|docs| options.apply(docs.values()))
            .unwrap_or_default())
    }

    async fn count(&self, collection: &str) -> DataAccessResult<usize> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len))
    }

    async fn average(&self, collection: &str, field: &str) -> DataAccessResult<Option<f64>> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(None);
        };
        let (sum, count) = docs
            .values()
            .filter_map(|doc| lookup(doc, field).and_then(JsonValue::as_f64))
            .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
        Ok((count > 0).then(|| sum / count as f64))
    }
}
