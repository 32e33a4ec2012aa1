pub mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use crate::error::DataAccessResult;
use crate::filter::FieldFilter;

pub type Row = Map<String, JsonValue>;

/// 列式数仓能力接口
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// 追加写入，返回写入行数
    async fn insert_rows(&self, table: &str, rows: Vec<Row>) -> DataAccessResult<usize>;

    /// 按插入顺序返回满足全部过滤条件的行
    async fn query(
        &self,
        table: &str,
        filters: &[FieldFilter],
        limit: Option<usize>,
    ) -> DataAccessResult<Vec<Row>>;

    async fn delete_rows(&self, table: &str, filters: &[FieldFilter]) -> DataAccessResult<usize>;
}
