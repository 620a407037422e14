//! Entity Metadata
//!
//! 엔티티별 정적 키 정의와 필드 접근 트레이트
//!
//! 드라이버는 이 트레이트로 키 필드를 읽고 결과 행을 엔티티로 되돌립니다.

use super::error::DriverResult;
use super::record::Row;
use super::types::Value;

// ============================================================================
// KeyColumn - 키 컬럼
// ============================================================================

/// 키 필드와 저장 컬럼
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyColumn {
    /// [`Entity::field`]에 전달할 필드 이름
    pub field: &'static str,
    /// 테이블 컬럼 이름
    pub column: &'static str,
}

impl KeyColumn {
    /// 새 키 컬럼 생성
    pub const fn new(field: &'static str, column: &'static str) -> Self {
        Self { field, column }
    }

    /// 필드와 컬럼 이름이 같은 키 컬럼
    pub const fn named(name: &'static str) -> Self {
        Self {
            field: name,
            column: name,
        }
    }
}

// ============================================================================
// EntityDescriptor - 엔티티 정의
// ============================================================================

/// 엔티티 타입의 테이블/키 메타데이터
///
/// ```rust
/// use cqlroute_driver::{EntityDescriptor, KeyColumn};
///
/// const ORDERS: EntityDescriptor = EntityDescriptor::new(
///     "orders",
///     &[KeyColumn::new("customer_id", "customer_id")],
///     &[KeyColumn::new("order_id", "order_id")],
/// );
///
/// assert_eq!(ORDERS.primary_key_len(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// 키스페이스 (`None`이면 드라이버 설정 사용)
    pub keyspace: Option<&'static str>,
    /// 테이블 이름 (라우팅 오버라이드 조회 키)
    pub table: &'static str,
    /// 파티션 키 (선언 순서)
    pub partition_keys: &'static [KeyColumn],
    /// 클러스터링 컬럼 (선언 순서)
    pub clustering_keys: &'static [KeyColumn],
}

impl EntityDescriptor {
    /// 새 정의 생성 (드라이버 키스페이스)
    pub const fn new(
        table: &'static str,
        partition_keys: &'static [KeyColumn],
        clustering_keys: &'static [KeyColumn],
    ) -> Self {
        Self {
            keyspace: None,
            table,
            partition_keys,
            clustering_keys,
        }
    }

    /// 키스페이스 지정
    pub const fn in_keyspace(self, keyspace: &'static str) -> Self {
        Self {
            keyspace: Some(keyspace),
            ..self
        }
    }

    /// 파티션 키 다음 클러스터링 키
    pub fn key_columns(&self) -> impl Iterator<Item = &'static KeyColumn> {
        self.partition_keys.iter().chain(self.clustering_keys.iter())
    }

    /// 기본 키 컬럼 수
    pub fn primary_key_len(&self) -> usize {
        self.partition_keys.len() + self.clustering_keys.len()
    }

    /// 기본 키 컬럼 여부
    pub fn is_key_column(&self, column: &str) -> bool {
        self.key_columns().any(|k| k.column == column)
    }
}

// ============================================================================
// Entity - 엔티티 트레이트
// ============================================================================

/// 단일 테이블에 매핑되는 타입
///
/// 선언된 키 필드마다 접근자를 연결합니다.
pub trait Entity: Sized + Send + Sync + 'static {
    /// 테이블/키 메타데이터
    const DESCRIPTOR: EntityDescriptor;

    /// 필드 읽기
    ///
    /// 접근자가 없으면 `None`, 필드는 있지만 값이 없으면 `Some(Value::Null)`.
    fn field(&self, field: &str) -> Option<Value>;

    /// 저장할 전체 컬럼과 값 (Null 포함)
    fn to_columns(&self) -> Vec<(&'static str, Value)>;

    /// 결과 행에서 생성
    fn from_row(row: &Row) -> DriverResult<Self>;
}
