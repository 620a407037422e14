//! Row - 결과 행
//!
//! 트랜스포트가 돌려준 단일 행

use std::collections::HashMap;
use std::fmt;

use super::error::{DriverError, DriverResult};
use super::types::Value;

// ============================================================================
// Row - 단일 행
// ============================================================================

/// 결과 행
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 컬럼 이름
    columns: Vec<String>,
    /// 값들 (`columns`와 같은 순서)
    values: Vec<Value>,
    /// 컬럼-인덱스 매핑
    column_index: HashMap<String, usize>,
}

impl Row {
    /// 새 행 생성
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        let column_index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();

        Self {
            columns,
            values,
            column_index,
        }
    }

    /// `(컬럼, 값)` 쌍으로 생성
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let (columns, values) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self::new(columns, values)
    }

    /// 빈 행 생성
    pub fn empty() -> Self {
        Self::new(vec![], vec![])
    }

    /// 컬럼 목록
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 값 목록
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// 컬럼 수
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 빈 행 여부
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 컬럼 이름으로 값 가져오기
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.column_index.get(column).and_then(|&i| self.values.get(i))
    }

    /// 인덱스로 값 가져오기
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// 타입 변환된 값 가져오기 (없는 컬럼은 바인딩 에러)
    pub fn get_as<T>(&self, column: &str) -> DriverResult<T>
    where
        T: TryFrom<Value, Error = DriverError>,
    {
        self.get(column)
            .cloned()
            .ok_or_else(|| DriverError::binding(format!("Column '{}' not found", column)))
            .and_then(|v| T::try_from(v))
    }

    /// 문자열 값 가져오기
    pub fn get_string(&self, column: &str) -> DriverResult<String> {
        self.get_as::<String>(column)
    }

    /// 정수 값 가져오기 (int/bigint)
    pub fn get_long(&self, column: &str) -> DriverResult<i64> {
        self.get_as::<i64>(column)
    }

    /// Optional 값 가져오기 (Null이나 없는 컬럼은 None)
    pub fn get_optional<T>(&self, column: &str) -> DriverResult<Option<T>>
    where
        T: TryFrom<Value, Error = DriverError>,
    {
        match self.get(column) {
            Some(Value::Null) | None => Ok(None),
            Some(v) => T::try_from(v.clone()).map(Some),
        }
    }

    /// Map으로 변환
    pub fn to_map(&self) -> HashMap<String, Value> {
        self.columns
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }

    /// 컬럼 존재 여부
    pub fn contains_column(&self, column: &str) -> bool {
        self.column_index.contains_key(column)
    }

    /// 컬럼 설정 (있으면 교체, 없으면 추가)
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.column_index.get(&column) {
            Some(&i) => self.values[i] = value,
            None => {
                self.column_index.insert(column.clone(), self.columns.len());
                self.columns.push(column);
                self.values.push(value);
            }
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .columns
            .iter()
            .zip(self.values.iter())
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::iter::Zip<std::slice::Iter<'a, String>, std::slice::Iter<'a, Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter().zip(self.values.iter())
    }
}

// ============================================================================
// Tests
// ============================================================================
