use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use crate::error::{DataAccessError, DataAccessResult};
use crate::filter::FieldFilter;
use crate::warehouse::{Row, Warehouse};

#[derive(Debug, Default)]
pub struct InMemoryWarehouse {
    tables: RwLock<HashMap<String, Vec<JsonValue>>>,
}

impl InMemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }
}

fn into_row(value: &JsonValue) -> Row {
    value.as_object().cloned().unwrap_or_default()
}

#[async_trait]
impl Warehouse for InMemoryWarehouse {
    async fn insert_rows(&self, table: &str, rows: Vec<Row>) -> DataAccessResult<usize> {
        let count = rows.len();
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .extend(rows.into_iter().map(JsonValue::Object));
        tracing::debug!(table, count, "写入数据行");
        Ok(count)
    }

    async fn query(
        &self,
        table: &str,
        filters: &[FieldFilter],
        limit: Option<usize>,
    ) -> DataAccessResult<Vec<Row>> {
        let tables = self.tables.read().await;
        let rows = tables
            .get(table)
            .ok_or_else(|| DataAccessError::NotFound(format!("table {}", table)))?;

        Ok(rows
            .iter()
            .filter(|row| FieldFilter::matches_all(filters, row))
            .take(limit.unwrap_or(usize::MAX))
            .map(into_row)
            .collect())
    }

    async fn delete_rows(&self, table: &str, filters: &[FieldFilter]) -> DataAccessResult<usize> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| DataAccessError::NotFound(format!("table {}", table)))?;

        let before = rows.len();
        rows.retain(|row| !FieldFilter::matches_all(filters, row));
        Ok(before - rows.len())
    }
}
