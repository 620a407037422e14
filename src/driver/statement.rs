//! Statements
//!
//! 트랜스포트 핸들에 전달하는 타입 있는 문장
//!
//! 각 문장은 로그용으로 `?` 자리표시자를 쓴 CQL을 만들고, 바인딩 값은 따로 전달합니다.

use std::fmt;

use super::entity::Entity;
use super::error::DriverResult;
use super::filter::KeyFilter;
use super::types::{ConsistencyLevel, Value};

/// DSE Search 인덱스의 검색 컬럼
pub const SEARCH_QUERY_COLUMN: &str = "solr_query";

// ============================================================================
// TableRef - 테이블 참조
// ============================================================================

/// 키스페이스를 포함한 테이블
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    /// Keyspace
    pub keyspace: String,
    /// Table
    pub table: String,
}

impl TableRef {
    /// 새 테이블 참조 생성
    pub fn new(keyspace: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            table: table.into(),
        }
    }

    /// 엔티티 타입의 테이블 (키스페이스가 없으면 `default_keyspace`)
    pub fn of<T: Entity>(default_keyspace: &str) -> Self {
        let descriptor = T::DESCRIPTOR;
        Self::new(
            descriptor.keyspace.unwrap_or(default_keyspace),
            descriptor.table,
        )
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.keyspace, self.table)
    }
}

// ============================================================================
// Select - 조회
// ============================================================================

/// 키 필터 조회
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    /// Target table
    pub table: TableRef,
    /// Key predicates
    pub filter: KeyFilter,
    /// Row limit
    pub limit: Option<i32>,
    /// Consistency
    pub consistency: ConsistencyLevel,
}

impl Select {
    /// 새 조회 생성 (제한 없음)
    pub fn new(table: TableRef, filter: KeyFilter, consistency: ConsistencyLevel) -> Self {
        Self {
            table,
            filter,
            limit: None,
            consistency,
        }
    }

    /// 행 수 제한
    pub fn with_limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// CQL text
    pub fn to_cql(&self) -> String {
        let mut cql = format!("SELECT * FROM {}{}", self.table, self.filter.where_clause());
        if let Some(limit) = self.limit {
            cql.push_str(&format!(" LIMIT {}", limit));
        }
        cql
    }
}

// ============================================================================
// Upsert - 저장
// ============================================================================

/// 한 행 삽입/갱신
#[derive(Debug, Clone, PartialEq)]
pub struct Upsert {
    /// Target table
    pub table: TableRef,
    /// Full primary key
    pub key: KeyFilter,
    /// Columns written, key columns included
    pub columns: Vec<(&'static str, Value)>,
    /// Consistency
    pub consistency: ConsistencyLevel,
}

impl Upsert {
    /// `entity` 저장 (`save_nulls`가 아니면 Null 컬럼 제외)
    ///
    /// Null을 쓰면 툼스톤이 생깁니다.
    pub fn from_entity<T: Entity>(
        entity: &T,
        table: TableRef,
        consistency: ConsistencyLevel,
        save_nulls: bool,
    ) -> DriverResult<Self> {
        let key = KeyFilter::primary_key(entity)?;
        let columns = entity
            .to_columns()
            .into_iter()
            .filter(|(_, value)| save_nulls || !value.is_null())
            .collect();

        Ok(Self {
            table,
            key,
            columns,
            consistency,
        })
    }

    /// 저장할 컬럼 목록
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|(name, _)| *name).collect()
    }

    /// CQL text
    pub fn to_cql(&self) -> String {
        let names = self.column_names();
        let placeholders = vec!["?"; names.len()];
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            names.join(", "),
            placeholders.join(", ")
        )
    }
}

// ============================================================================
// Delete - 삭제
// ============================================================================

/// 전체 기본 키로 삭제
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    /// Target table
    pub table: TableRef,
    /// Full primary key
    pub key: KeyFilter,
    /// Consistency
    pub consistency: ConsistencyLevel,
}

impl Delete {
    /// `entity` 기본 키의 행 삭제
    pub fn from_entity<T: Entity>(
        entity: &T,
        table: TableRef,
        consistency: ConsistencyLevel,
    ) -> DriverResult<Self> {
        Ok(Self {
            table,
            key: KeyFilter::primary_key(entity)?,
            consistency,
        })
    }

    /// CQL text
    pub fn to_cql(&self) -> String {
        format!("DELETE FROM {}{}", self.table, self.key.where_clause())
    }
}

// ============================================================================
// SearchQuery - 검색
// ============================================================================

/// 검색 인덱스 테이블 텍스트 검색
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Target table
    pub table: TableRef,
    /// 검색 쿼리 문자열
    pub query: String,
    /// 행 수 제한 (카운트에는 무시)
    pub limit: Option<i32>,
}

impl SearchQuery {
    /// 새 검색 생성
    pub fn new(table: TableRef, query: impl Into<String>) -> Self {
        Self {
            table,
            query: query.into(),
            limit: None,
        }
    }

    /// Limit the number of rows
    pub fn with_limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// 행 조회 CQL
    pub fn to_cql(&self) -> String {
        let mut cql = format!(
            "SELECT * FROM {} WHERE {} = ?",
            self.table, SEARCH_QUERY_COLUMN
        );
        if let Some(limit) = self.limit {
            cql.push_str(&format!(" LIMIT {}", limit));
        }
        cql
    }

    /// 카운트 CQL
    pub fn to_count_cql(&self) -> String {
        format!(
            "SELECT count(*) FROM {} WHERE {} = ?",
            self.table, SEARCH_QUERY_COLUMN
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
