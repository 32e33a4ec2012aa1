pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DataAccessError, DataAccessResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub bucket: String,
    pub name: String,
    pub size: usize,
    pub content_type: String,
    pub updated: DateTime<Utc>,
}

/// 对象存储能力接口
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 覆盖写入
    async fn put(
        &self,
        bucket: &str,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> DataAccessResult<ObjectMeta>;

    async fn get(&self, bucket: &str, name: &str) -> DataAccessResult<Vec<u8>>;

    async fn metadata(&self, bucket: &str, name: &str) -> DataAccessResult<ObjectMeta>;

    async fn exists(&self, bucket: &str, name: &str) -> DataAccessResult<bool>;

    async fn delete(&self, bucket: &str, name: &str) -> DataAccessResult<()>;

    /// 按名称排序
    async fn list(&self, bucket: &str, prefix: &str) -> DataAccessResult<Vec<ObjectMeta>>;

    /// 只读取 `max_age` 内更新过的对象，否则返回 Expired
    async fn get_fresh(&self, bucket: &str, name: &str, max_age: Duration) -> DataAccessResult<Vec<u8>> {
        let meta = self.metadata(bucket, name).await?;
        let age = meta.age();
        if age > max_age {
            return Err(DataAccessError::Expired(format!(
                "gs://{}/{} is {:.3}s old, allowed {:.3}s",
                bucket,
                name,
                age.as_secs_f64(),
                max_age.as_secs_f64()
            )));
        }
        self.get(bucket, name).await
    }
}

impl ObjectMeta {
    /// 距最近一次写入的时长，时钟回拨时为 0
    pub fn age(&self) -> Duration {
        (Utc::now() - self.updated).to_std().unwrap_or_default()
    }
}
