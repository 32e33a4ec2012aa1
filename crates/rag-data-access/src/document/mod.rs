pub mod memory;

use std::cmp::Ordering;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::DataAccessResult;
use crate::filter::{FieldFilter, FilterOperator, lookup};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// list 的查询条件：过滤、排序、分页
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    pub filters: Vec<FieldFilter>,
    pub operator: FilterOperator,
    pub order_by: Option<OrderBy>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filtered(filters: impl IntoIterator<Item = FieldFilter>) -> Self {
        Self {
            filters: filters.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// 任一过滤条件匹配即可
    pub fn any(mut self) -> Self {
        self.operator = FilterOperator::Or;
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// 从 0 开始的页码
    pub fn page(mut self, page: usize, size: usize) -> Self {
        self.offset = page.saturating_mul(size);
        self.limit = Some(size);
        self
    }

    /// 依次执行过滤、排序、分页
    ///
    /// 指定排序字段时，缺少该字段的文档不会出现在结果中。
    pub fn apply<'a>(&self, docs: impl IntoIterator<Item = &'a JsonValue>) -> Vec<JsonValue> {
        let mut matched: Vec<&JsonValue> = docs
            .into_iter()
            .filter(|doc| FieldFilter::matches_with(&self.filters, self.operator, doc))
            .collect();

        if let Some(order) = &self.order_by {
            matched.retain(|doc| lookup(doc, &order.field).is_some());
            matched.sort_by(|a, b| {
                let ordering = match (lookup(a, &order.field), lookup(b, &order.field)) {
                    (Some(a), Some(b)) => compare_values(a, b),
                    _ => Ordering::Equal,
                };
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        matched
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

fn type_rank(value: &JsonValue) -> u8 {
    match value {
        JsonValue::Null => 0,
        JsonValue::Bool(_) => 1,
        JsonValue::Number(_) => 2,
        JsonValue::String(_) => 3,
        JsonValue::Array(_) => 4,
        JsonValue::Object(_) => 5,
    }
}

/// 先按类型再按值比较：null < bool < number < string < array < object
pub fn compare_values(a: &JsonValue, b: &JsonValue) -> Ordering {
    match (a, b) {
        (JsonValue::Bool(a), JsonValue::Bool(b)) => a.cmp(b),
        (JsonValue::Number(a), JsonValue::Number(b)) => a
            .as_f64()
            .zip(b.as_f64())
            .and_then(|(a, b)| a.partial_cmp(&b))
            .unwrap_or(Ordering::Equal),
        (JsonValue::String(a), JsonValue::String(b)) => a.cmp(b),
        (JsonValue::Array(a), JsonValue::Array(b)) => a
            .iter()
            .zip(b)
            .map(|(a, b)| compare_values(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// 文档数据库能力接口，文档必须是 JSON 对象
///
/// 子集合以 `{collection}/{id}/{name}` 命名。
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 已存在同 id 文档时返回 AlreadyExists
    async fn create(&self, collection: &str, id: &str, doc: JsonValue) -> DataAccessResult<()>;

    async fn set(&self, collection: &str, id: &str, doc: JsonValue) -> DataAccessResult<()>;

    async fn get(&self, collection: &str, id: &str) -> DataAccessResult<JsonValue>;

    async fn exists(&self, collection: &str, id: &str) -> DataAccessResult<bool>;

    /// 浅合并 `fields` 到已有文档，返回合并后的文档
    async fn update(&self, collection: &str, id: &str, fields: JsonValue) -> DataAccessResult<JsonValue>;

    /// 返回文档是否存在过，子集合保持不变
    async fn delete(&self, collection: &str, id: &str) -> DataAccessResult<bool>;

    /// 删除文档及其下所有层级的子集合
    async fn delete_cascade(&self, collection: &str, id: &str) -> DataAccessResult<bool>;

    /// 清空集合，返回删除的文档数
    async fn delete_all(&self, collection: &str) -> DataAccessResult<usize>;

    async fn list(&self, collection: &str, options: &ListOptions) -> DataAccessResult<Vec<JsonValue>>;

    async fn count(&self, collection: &str) -> DataAccessResult<usize>;

    /// 数值字段的平均值，忽略缺少该字段或非数值的文档；没有可用值时返回 None
    async fn average(&self, collection: &str, field: &str) -> DataAccessResult<Option<f64>>;
}
