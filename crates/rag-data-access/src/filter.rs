use serde_json::Value as JsonValue;

/// 多个过滤条件之间的组合方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterOperator {
    #[default]
    And,
    Or,
}

/// 按 `a.b.c` 路径取出嵌套字段
pub fn lookup<'a>(record: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.').try_fold(record, |current, key| current.get(key))
}

/// 字段等值过滤，`field` 支持 `a.b.c` 形式的嵌套路径
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: JsonValue,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &JsonValue) -> bool {
        lookup(record, &self.field).is_some_and(|found| *found == self.value)
    }

    pub fn matches_all(filters: &[FieldFilter], record: &JsonValue) -> bool {
        filters.iter().all(|f| f.matches(record))
    }

    /// 空过滤条件总是匹配，与组合方式无关
    pub fn matches_with(filters: &[FieldFilter], operator: FilterOperator, record: &JsonValue) -> bool {
        match operator {
            _ if filters.is_empty() => true,
            FilterOperator::And => Self::matches_all(filters, record),
            FilterOperator::Or => filters.iter().any(|f| f.matches(record)),
        }
    }
}
