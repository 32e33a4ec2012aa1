pub mod collection;
pub mod document;
pub mod error;
pub mod filter;
pub mod object;
pub mod warehouse;

use uuid::Uuid;

pub use collection::{Collection, Record};
pub use document::{Direction, DocumentStore, ListOptions, OrderBy, memory::InMemoryDocumentStore};
pub use error::{DataAccessError, DataAccessResult};
pub use filter::{FieldFilter, FilterOperator};
pub use object::{ObjectMeta, ObjectStore, memory::InMemoryObjectStore};
pub use warehouse::{Row, Warehouse, memory::InMemoryWarehouse};

/// 由名称生成确定性的 UUID（v5，OID 命名空间）
pub fn create_uuid(name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}
