//! Driver Types
//!
//! 드라이버에서 사용하는 타입 정의 (컬럼 값, 일관성 수준, 작업 종류)

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{DriverError, DriverResult};

// ============================================================================
// Value - 컬럼 값
// ============================================================================

/// CQL 컬럼 값
///
/// 직렬화 시 변형 이름을 태그로 사용합니다 (`{"BigInt":5}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null / unset
    Null,
    /// boolean
    Boolean(bool),
    /// int
    Int(i32),
    /// bigint / counter
    BigInt(i64),
    /// double
    Double(f64),
    /// text / varchar / ascii
    Text(String),
    /// blob
    Blob(Vec<u8>),
    /// uuid / timeuuid
    Uuid(Uuid),
    /// timestamp
    Timestamp(DateTime<Utc>),
    /// list / set
    List(Vec<Value>),
    /// map with text keys
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Null 여부
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// bool로 변환
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// i64로 변환 (`int`는 확장)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i as i64),
            Value::BigInt(i) => Some(*i),
            _ => None,
        }
    }

    /// f64로 변환
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::BigInt(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// 문자열 참조
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// uuid로 변환
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// CQL 타입 이름
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::BigInt(_) => "bigint",
            Value::Double(_) => "double",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
            Value::Uuid(_) => "uuid",
            Value::Timestamp(_) => "timestamp",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::BigInt(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::List(l) => write!(f, "[{} items]", l.len()),
            Value::Map(m) => write!(f, "{{{} entries}}", m.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

fn mismatch(value: &Value, target: &str) -> DriverError {
    DriverError::binding(format!("Cannot convert {} to {}", value.type_name(), target))
}

impl TryFrom<Value> for bool {
    type Error = DriverError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_bool().ok_or_else(|| mismatch(&value, "bool"))
    }
}

impl TryFrom<Value> for i32 {
    type Error = DriverError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Int(i) => Ok(i),
            _ => Err(mismatch(&value, "i32")),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = DriverError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_i64().ok_or_else(|| mismatch(&value, "i64"))
    }
}

impl TryFrom<Value> for f64 {
    type Error = DriverError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_f64().ok_or_else(|| mismatch(&value, "f64"))
    }
}

impl TryFrom<Value> for String {
    type Error = DriverError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Text(s) => Ok(s),
            _ => Err(mismatch(&value, "String")),
        }
    }
}

impl TryFrom<Value> for Uuid {
    type Error = DriverError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_uuid().ok_or_else(|| mismatch(&value, "Uuid"))
    }
}

impl TryFrom<Value> for DateTime<Utc> {
    type Error = DriverError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Timestamp(ts) => Ok(ts),
            _ => Err(mismatch(&value, "DateTime<Utc>")),
        }
    }
}

// ============================================================================
// ConsistencyLevel - 일관성 수준
// ============================================================================

/// 읽기/쓰기에 요청하는 레플리카 응답 수준
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsistencyLevel {
    /// ANY
    Any,
    /// ONE
    One,
    /// TWO
    Two,
    /// THREE
    Three,
    /// QUORUM
    Quorum,
    /// ALL
    All,
    /// LOCAL_QUORUM
    LocalQuorum,
    /// EACH_QUORUM
    EachQuorum,
    /// SERIAL
    Serial,
    /// LOCAL_SERIAL
    LocalSerial,
    /// LOCAL_ONE
    LocalOne,
}

impl ConsistencyLevel {
    /// 전체 수준 (프로토콜 코드 순서)
    pub const ALL_LEVELS: [ConsistencyLevel; 11] = [
        Self::Any,
        Self::One,
        Self::Two,
        Self::Three,
        Self::Quorum,
        Self::All,
        Self::LocalQuorum,
        Self::EachQuorum,
        Self::Serial,
        Self::LocalSerial,
        Self::LocalOne,
    ];

    /// CQL 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "ANY",
            Self::One => "ONE",
            Self::Two => "TWO",
            Self::Three => "THREE",
            Self::Quorum => "QUORUM",
            Self::All => "ALL",
            Self::LocalQuorum => "LOCAL_QUORUM",
            Self::EachQuorum => "EACH_QUORUM",
            Self::Serial => "SERIAL",
            Self::LocalSerial => "LOCAL_SERIAL",
            Self::LocalOne => "LOCAL_ONE",
        }
    }

    /// 코디네이터 데이터센터 안에서 충족되는 수준인지 확인
    pub fn is_dc_local(&self) -> bool {
        matches!(self, Self::LocalQuorum | Self::LocalSerial | Self::LocalOne)
    }
}

impl Default for ConsistencyLevel {
    fn default() -> Self {
        Self::LocalQuorum
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsistencyLevel {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        Self::ALL_LEVELS
            .iter()
            .copied()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| DriverError::binding(format!("Unknown consistency level '{}'", s)))
    }
}

// ============================================================================
// OperationKind - 작업 종류
// ============================================================================

/// 읽기/쓰기 구분 (오버라이드의 어느 일관성을 쓸지 결정)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// 읽기
    Read,
    /// 쓰기
    Write,
}

impl OperationKind {
    /// 소문자 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = DriverError;

    fn from_str(s: &str) -> DriverResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            _ => Err(DriverError::invalid_argument(format!(
                "Unknown operation kind '{}', expected 'read' or 'write'",
                s
            ))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert!(Value::Null.is_null());
        assert_eq!(Value::Int(7).as_i64(), Some(7));
        assert_eq!(Value::BigInt(7).as_f64(), Some(7.0));
        assert_eq!(Value::Text("a".into()).as_str(), Some("a"));
        assert_eq!(Value::Boolean(true).as_str(), None);
    }

    #[test]
    fn test_value_from_option() {
        let some: Value = Some("east").into();
        assert_eq!(some, Value::Text("east".to_string()));

        let none: Value = Option::<i64>::None.into();
        assert!(none.is_null());
    }

    #[test]
    fn test_value_try_from_mismatch_is_binding_error() {
        let err = i32::try_from(Value::Text("x".into())).unwrap_err();
        assert!(matches!(err, DriverError::Binding(_)));
        assert_eq!(err.to_string(), "Binding error: Cannot convert text to i32");
    }

    #[test]
    fn test_value_serde_keeps_variant() {
        use chrono::TimeZone;

        let mut map = BTreeMap::new();
        map.insert("dc".to_string(), Value::Text("east".to_string()));
        map.insert("weight".to_string(), Value::BigInt(3));

        let values = vec![
            Value::Null,
            Value::Boolean(true),
            Value::Int(5),
            Value::BigInt(5),
            Value::Double(2.5),
            Value::Text("2024-01-02T03:04:05Z".to_string()),
            Value::Blob(vec![1, 2, 3]),
            Value::Uuid(Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0)),
            Value::Timestamp(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            Value::List(vec![Value::Int(1), Value::Int(2)]),
            Value::Map(map),
        ];

        for value in values {
            let json = serde_json::to_string(&value).unwrap();
            let back: Value = serde_json::from_str(&json).unwrap();
            assert_eq!(back, value, "{} via {}", value.type_name(), json);
        }
    }

    #[test]
    fn test_value_serde_tag_format() {
        assert_eq!(serde_json::to_string(&Value::BigInt(5)).unwrap(), r#"{"BigInt":5}"#);
        assert_eq!(serde_json::to_string(&Value::Null).unwrap(), r#""Null""#);
    }

    #[test]
    fn test_consistency_serde_name() {
        let json = serde_json::to_string(&ConsistencyLevel::LocalQuorum).unwrap();
        assert_eq!(json, r#""LOCAL_QUORUM""#);
        let back: ConsistencyLevel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ConsistencyLevel::LocalQuorum);
    }

    #[test]
    fn test_consistency_round_trip_names() {
        for level in ConsistencyLevel::ALL_LEVELS {
            assert_eq!(level.as_str().parse::<ConsistencyLevel>().unwrap(), level);
        }
        assert_eq!(
            "local_quorum".parse::<ConsistencyLevel>().unwrap(),
            ConsistencyLevel::LocalQuorum
        );
    }

    #[test]
    fn test_consistency_unknown_is_binding_error() {
        let err = "MOSTLY".parse::<ConsistencyLevel>().unwrap_err();
        assert!(matches!(err, DriverError::Binding(_)));
    }

    #[test]
    fn test_consistency_default_and_locality() {
        assert_eq!(ConsistencyLevel::default(), ConsistencyLevel::LocalQuorum);
        assert!(ConsistencyLevel::LocalOne.is_dc_local());
        assert!(!ConsistencyLevel::Quorum.is_dc_local());
    }

    #[test]
    fn test_operation_kind_parse() {
        assert_eq!("read".parse::<OperationKind>().unwrap(), OperationKind::Read);
        assert_eq!("WRITE".parse::<OperationKind>().unwrap(), OperationKind::Write);

        for bad in ["delete", "", "readwrite"] {
            let err = bad.parse::<OperationKind>().unwrap_err();
            assert!(matches!(err, DriverError::InvalidArgument(_)));
        }
    }
}
