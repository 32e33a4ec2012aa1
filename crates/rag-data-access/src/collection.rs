use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::try_join_all;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::document::{DocumentStore, ListOptions};
use crate::error::DataAccessResult;

/// 可以存入集合的记录类型
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    fn id(&self) -> String;
}

/// 在 DocumentStore 之上按类型读写一个集合
///
/// 每个项目组合一个 `Collection<T>`，而不是继承通用 DAO。
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    name: String,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            name: self.name.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
            _record: PhantomData,
        }
    }

    /// 嵌套在父文档下的子集合，路径形如 `parent/doc/child`
    pub fn nested(
        store: Arc<dyn DocumentStore>,
        parent_collection: &str,
        parent_document: &str,
        name: &str,
    ) -> Self {
        Self::new(store, format!("{}/{}/{}", parent_collection, parent_document, name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn create(&self, record: &T) -> DataAccessResult<()> {
        let doc = serde_json::to_value(record)?;
        self.store.create(&self.name, &record.id(), doc).await
    }

    pub async fn create_many(&self, records: &[T]) -> DataAccessResult<()> {
        try_join_all(records.iter().map(|record| self.create(record))).await?;
        Ok(())
    }

    pub async fn set(&self, record: &T) -> DataAccessResult<()> {
        let doc = serde_json::to_value(record)?;
        self.store.set(&self.name, &record.id(), doc).await
    }

    pub async fn get(&self, id: &str) -> DataAccessResult<T> {
        let doc = self.store.get(&self.name, id).await?;
        Ok(serde_json::from_value(doc)?)
    }

    pub async fn exists(&self, id: &str) -> DataAccessResult<bool> {
        self.store.exists(&self.name, id).await
    }

    pub async fn delete(&self, id: &str) -> DataAccessResult<bool> {
        self.store.delete(&self.name, id).await
    }

    /// 连同该记录下的所有子集合一起删除
    pub async fn delete_cascade(&self, id: &str) -> DataAccessResult<bool> {
        self.store.delete_cascade(&self.name, id).await
    }

    pub async fn delete_all(&self) -> DataAccessResult<usize> {
        self.store.delete_all(&self.name).await
    }

    pub async fn count(&self) -> DataAccessResult<usize> {
        self.store.count(&self.name).await
    }

    pub async fn average(&self, field: &str) -> DataAccessResult<Option<f64>> {
        self.store.average(&self.name, field).await
    }

    pub async fn list(&self, options: &ListOptions) -> DataAccessResult<Vec<T>> {
        self.store
            .list(&self.name, options)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(Into::into))
            .collect()
    }
}
