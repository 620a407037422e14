//! Transport
//!
//! 드라이버는 작업을 어느 데이터센터에서 어떤 일관성으로 실행할지만 정하고,
//! 실제 연결 풀은 [`TransportProvider`]가 열고 [`TransportHandle`]이 문장을 실행합니다.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::driver::{ClusterTopology, DriverConfig};
use super::error::DriverResult;
use super::pool::RoutingKey;
use super::record::Row;
use super::statement::{Delete, SearchQuery, Select, Upsert};
use super::types::ConsistencyLevel;

// ============================================================================
// ConnectionTarget - 연결 대상
// ============================================================================

/// 핸들의 로드 밸런싱 범위
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetScope {
    /// 대상 데이터센터 우선, 원격 DC별 제한된 호스트로 페일오버
    HighAvailability {
        /// 원격 데이터센터별 사용 호스트 수
        used_hosts_per_remote_dc: u32,
        /// LOCAL_* 일관성을 원격 호스트가 처리해도 되는지
        allow_remote_for_local_consistency: bool,
    },
    /// 대상 데이터센터 호스트만 사용
    SingleDatacenter,
}

/// 트랜스포트 핸들 연결 대상
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    /// 캐시 키
    pub routing_key: RoutingKey,
    /// 로컬로 취급할 데이터센터
    pub datacenter: String,
    /// 로드 밸런싱 범위
    pub scope: TargetScope,
}

impl ConnectionTarget {
    /// `key`의 연결 대상
    ///
    /// 기본 키는 로컬 데이터센터 기준으로 설정된 토폴로지를 쓰고,
    /// 다른 키는 이름이 가리키는 데이터센터 하나에만 연결합니다.
    pub fn for_key(key: &RoutingKey, config: &DriverConfig) -> Self {
        if key.is_default() {
            let scope = match config.topology {
                ClusterTopology::HighAvailability => TargetScope::HighAvailability {
                    used_hosts_per_remote_dc: config.remote_hosts_per_datacenter,
                    allow_remote_for_local_consistency: true,
                },
                ClusterTopology::SingleDatacenter => TargetScope::SingleDatacenter,
            };
            Self {
                routing_key: key.clone(),
                datacenter: config.local_datacenter.clone(),
                scope,
            }
        } else {
            Self {
                routing_key: key.clone(),
                datacenter: key.as_str().to_string(),
                scope: TargetScope::SingleDatacenter,
            }
        }
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            TargetScope::HighAvailability {
                used_hosts_per_remote_dc,
                ..
            } => write!(
                f,
                "{} (HA, local DC {}, {} hosts per remote DC)",
                self.routing_key, self.datacenter, used_hosts_per_remote_dc
            ),
            TargetScope::SingleDatacenter => {
                write!(f, "{} (single DC {})", self.routing_key, self.datacenter)
            }
        }
    }
}

// ============================================================================
// Traits - 트랜스포트 트레이트
// ============================================================================

/// 트랜스포트 핸들 생성기
///
/// 구현체는 [`DriverConfig`]의 풀/타임아웃/재연결/인증/TLS 설정을 적용합니다.
#[async_trait]
pub trait TransportProvider: Send + Sync {
    /// `target` 연결 풀 열기
    async fn open(
        &self,
        target: &ConnectionTarget,
        config: &DriverConfig,
    ) -> DriverResult<Arc<dyn TransportHandle>>;
}

/// 한 데이터센터에 열린 연결 풀
#[async_trait]
pub trait TransportHandle: Send + Sync + fmt::Debug {
    /// 키 필터 조회
    async fn select(&self, select: &Select) -> DriverResult<Vec<Row>>;

    /// 전체 기본 키로 단건 조회
    async fn fetch(&self, select: &Select) -> DriverResult<Option<Row>> {
        let rows = self.select(&select.clone().with_limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// 한 행 저장
    async fn upsert(&self, upsert: &Upsert) -> DriverResult<()>;

    /// 한 행 삭제
    async fn delete(&self, delete: &Delete) -> DriverResult<()>;

    /// 텍스트 검색
    async fn search(&self, query: &SearchQuery) -> DriverResult<Vec<Row>>;

    /// 검색 카운트 (서버가 행을 주지 않으면 `None`)
    async fn count(&self, query: &SearchQuery) -> DriverResult<Option<i64>>;

    /// CQL 직접 실행
    async fn execute(
        &self,
        cql: &str,
        consistency: Option<ConsistencyLevel>,
    ) -> DriverResult<Vec<Row>>;

    /// 풀 해제 (이미 닫힌 핸들도 성공)
    async fn close(&self) -> DriverResult<()>;
}
