//! Driver Error Types
//!
//! 드라이버 에러 정의

use std::io;
use thiserror::Error;

// ============================================================================
// DriverError - 드라이버 에러
// ============================================================================

/// 드라이버 에러
#[derive(Error, Debug)]
pub enum DriverError {
    /// 설정 에러 (연결 시도 전에 발생)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 연결 에러
    #[error("Connection error: {0}")]
    Connection(String),

    /// 비활성화된 기능 사용
    #[error("Feature disabled: {0}")]
    FeatureDisabled(String),

    /// 바인딩 에러 (키 필드를 읽지 못했거나 값을 변환하지 못함)
    #[error("Binding error: {0}")]
    Binding(String),

    /// 잘못된 인자
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 쿼리 에러
    #[error("Query error: {code} - {message}")]
    Query { code: String, message: String },

    /// 타임아웃 에러
    #[error("Timeout: {0}")]
    Timeout(String),

    /// 종료된 드라이버
    #[error("Driver is closed")]
    Closed,

    /// IO 에러
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// 내부 에러
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DriverError {
    /// 설정 에러 생성
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// 연결 에러 생성
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// 기능 비활성화 에러 생성
    pub fn feature_disabled(msg: impl Into<String>) -> Self {
        Self::FeatureDisabled(msg.into())
    }

    /// 바인딩 에러 생성
    pub fn binding(msg: impl Into<String>) -> Self {
        Self::Binding(msg.into())
    }

    /// 잘못된 인자 에러 생성
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// 쿼리 에러 생성
    pub fn query(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            code: code.into(),
            message: message.into(),
        }
    }

    /// 타임아웃 에러 생성
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// 내부 에러 생성
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// 재시도 가능 여부
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_) | Self::Io(_))
    }

    /// 호출자 잘못 여부
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::FeatureDisabled(_)
                | Self::Binding(_)
                | Self::InvalidArgument(_)
        )
    }
}

impl From<tokio::task::JoinError> for DriverError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            DriverError::internal("background write was cancelled")
        } else {
            DriverError::internal(format!("background write panicked: {}", err))
        }
    }
}

// ============================================================================
// Result Type - 결과 타입
// ============================================================================

/// 드라이버 결과 타입
pub type DriverResult<T> = Result<T, DriverError>;

// ============================================================================
// Tests
// ============================================================================
