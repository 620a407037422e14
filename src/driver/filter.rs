//! Key Filters
//!
//! 파티션/클러스터링 키 동등 조건 필터

use std::fmt;

use super::entity::{Entity, EntityDescriptor, KeyColumn};
use super::error::{DriverError, DriverResult};
use super::types::Value;

/// `column = value`
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// 컬럼 이름
    pub column: &'static str,
    /// 바인딩 값 (Null 아님)
    pub value: Value,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.column, self.value)
    }
}

/// 키 동등 조건 목록
///
/// 파티션 키 조건이 먼저, 그 다음 클러스터링 키 조건 (각각 선언 순서).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyFilter {
    predicates: Vec<Predicate>,
}

impl KeyFilter {
    /// 빈 필터
    pub fn new() -> Self {
        Self::default()
    }

    /// `entity`의 값이 있는 키 필드로 필터 생성
    ///
    /// 값이 없는 키 필드는 빠지므로 파티션 키만 채운 인스턴스로 파티션 스캔이 됩니다.
    pub fn from_entity<T: Entity>(entity: &T) -> DriverResult<Self> {
        Self::build(&T::DESCRIPTOR, |field| entity.field(field))
    }

    /// 전체 기본 키 필터 (빠진 필드는 에러)
    pub fn primary_key<T: Entity>(entity: &T) -> DriverResult<Self> {
        Self::build_full(&T::DESCRIPTOR, |field| entity.field(field))
    }

    /// Filter from a descriptor and a field reader
    ///
    /// `read`는 접근자가 없는 필드에 `None`을 반환합니다.
    pub fn build<F>(descriptor: &EntityDescriptor, read: F) -> DriverResult<Self>
    where
        F: Fn(&str) -> Option<Value>,
    {
        let mut predicates = Vec::with_capacity(descriptor.primary_key_len());
        for key in descriptor.key_columns() {
            let value = read_key(descriptor, key, &read)?;
            if !value.is_null() {
                predicates.push(Predicate {
                    column: key.column,
                    value,
                });
            }
        }
        Ok(Self { predicates })
    }

    /// Like [`KeyFilter::build`] but every key column must be populated
    pub fn build_full<F>(descriptor: &EntityDescriptor, read: F) -> DriverResult<Self>
    where
        F: Fn(&str) -> Option<Value>,
    {
        if descriptor.partition_keys.is_empty() {
            return Err(DriverError::binding(format!(
                "Entity for table '{}' declares no partition key",
                descriptor.table
            )));
        }

        let mut predicates = Vec::with_capacity(descriptor.primary_key_len());
        for key in descriptor.key_columns() {
            let value = read_key(descriptor, key, &read)?;
            if value.is_null() {
                return Err(DriverError::binding(format!(
                    "Primary key column '{}' of table '{}' is not populated",
                    key.column, descriptor.table
                )));
            }
            predicates.push(Predicate {
                column: key.column,
                value,
            });
        }
        Ok(Self { predicates })
    }

    /// 조건 목록
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// 조건 수
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// 전체 테이블 선택 여부
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// 바인딩 값 목록
    pub fn values(&self) -> Vec<Value> {
        self.predicates.iter().map(|p| p.value.clone()).collect()
    }

    /// Value bound for `column`
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.predicates
            .iter()
            .find(|p| p.column == column)
            .map(|p| &p.value)
    }

    /// `?` 자리표시자를 쓴 `WHERE` 절 (조건이 없으면 빈 문자열)
    pub fn where_clause(&self) -> String {
        if self.predicates.is_empty() {
            return String::new();
        }
        let terms: Vec<String> = self
            .predicates
            .iter()
            .map(|p| format!("{} = ?", p.column))
            .collect();
        format!(" WHERE {}", terms.join(" AND "))
    }
}

impl fmt::Display for KeyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self.predicates.iter().map(|p| p.to_string()).collect();
        write!(f, "[{}]", terms.join(" AND "))
    }
}

fn read_key<F>(descriptor: &EntityDescriptor, key: &KeyColumn, read: &F) -> DriverResult<Value>
where
    F: Fn(&str) -> Option<Value>,
{
    read(key.field).ok_or_else(|| {
        DriverError::binding(format!(
            "No accessor bound for key field '{}' of table '{}'",
            key.field, descriptor.table
        ))
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testkit::Order;

    fn order(customer: Option<&str>, order_id: Option<i64>) -> Order {
        Order {
            customer_id: customer.map(str::to_string),
            order_id,
            status: Some("open".to_string()),
            note: None,
        }
    }

    #[test]
    fn test_partition_only_omits_clustering() {
        let filter = KeyFilter::from_entity(&order(Some("c1"), None)).unwrap();
        assert_eq!(filter.len(), 1);
        assert_eq!(filter.predicates()[0].column, "customer_id");
        assert!(filter.get("order_id").is_none());
        assert_eq!(filter.where_clause(), " WHERE customer_id = ?");
    }

    #[test]
    fn test_full_key_covers_every_key_column() {
        let filter = KeyFilter::from_entity(&order(Some("c1"), Some(42))).unwrap();
        let columns: Vec<&str> = filter.predicates().iter().map(|p| p.column).collect();
        assert_eq!(columns, vec!["customer_id", "order_id"]);
        assert_eq!(filter.values(), vec![Value::from("c1"), Value::BigInt(42)]);
        assert_eq!(
            filter.where_clause(),
            " WHERE customer_id = ? AND order_id = ?"
        );
    }

    #[test]
    fn test_build_is_idempotent() {
        let entity = order(Some("c1"), Some(7));
        let first = KeyFilter::from_entity(&entity).unwrap();
        let second = KeyFilter::from_entity(&entity).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_nothing_populated_is_empty_filter() {
        let filter = KeyFilter::from_entity(&order(None, None)).unwrap();
        assert!(filter.is_empty());
        assert_eq!(filter.where_clause(), "");
    }

    #[test]
    fn test_order_follows_descriptor_not_population() {
        const DESCRIPTOR: EntityDescriptor = EntityDescriptor::new(
            "readings",
            &[KeyColumn::named("sensor"), KeyColumn::named("day")],
            &[KeyColumn::named("ts"), KeyColumn::named("seq")],
        );
        let filter = KeyFilter::build(&DESCRIPTOR, |field| match field {
            "sensor" => Some(Value::from("s-1")),
            "day" => Some(Value::Null),
            "ts" => Some(Value::BigInt(10)),
            "seq" => Some(Value::Int(2)),
            _ => None,
        })
        .unwrap();

        let columns: Vec<&str> = filter.predicates().iter().map(|p| p.column).collect();
        assert_eq!(columns, vec!["sensor", "ts", "seq"]);
    }

    #[test]
    fn test_missing_accessor_is_binding_error() {
        const DESCRIPTOR: EntityDescriptor =
            EntityDescriptor::new("broken", &[KeyColumn::named("id")], &[]);
        let err = KeyFilter::build(&DESCRIPTOR, |_| None).unwrap_err();
        assert!(matches!(err, DriverError::Binding(_)));
        assert!(err.to_string().contains("'id'"));
    }

    #[test]
    fn test_primary_key_requires_every_column() {
        let err = KeyFilter::primary_key(&order(Some("c1"), None)).unwrap_err();
        assert!(matches!(err, DriverError::Binding(_)));
        assert!(err.to_string().contains("order_id"));

        let filter = KeyFilter::primary_key(&order(Some("c1"), Some(1))).unwrap();
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn test_primary_key_requires_partition_key() {
        const DESCRIPTOR: EntityDescriptor = EntityDescriptor::new("keyless", &[], &[]);
        let err = KeyFilter::build_full(&DESCRIPTOR, |_| None).unwrap_err();
        assert!(matches!(err, DriverError::Binding(_)));
    }

    #[test]
    fn test_display() {
        let filter = KeyFilter::from_entity(&order(Some("c1"), Some(3))).unwrap();
        assert_eq!(filter.to_string(), "[customer_id = 'c1' AND order_id = 3]");
    }
}
