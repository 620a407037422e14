//! Driver
//!
//! 드라이버 설정 및 데이터센터 라우팅 CRUD 파사드

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::entity::Entity;
use super::error::{DriverError, DriverResult};
use super::filter::KeyFilter;
use super::pool::{ConnectionRegistry, RoutingKey};
use super::record::Row;
use super::routing::{
    RegistryRoutingStore, Route, RoutingResolver, RoutingTableCache, RoutingTableStore,
    DEFAULT_ROUTING_TABLE,
};
use super::statement::{Delete, SearchQuery, Select, TableRef, Upsert};
use super::transport::{TransportHandle, TransportProvider};
use super::types::{ConsistencyLevel, OperationKind};

/// 비밀 값 대신 표시
const MASKED: &str = "MASKED";

/// [`Driver::get_all_by_search`] 기본 행 수
pub const DEFAULT_SEARCH_LIMIT: i32 = 10;

// ============================================================================
// Credentials - 인증 정보
// ============================================================================

/// 사용자명/비밀번호
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// 사용자명
    pub username: String,
    /// 비밀번호
    pub password: String,
}

impl Credentials {
    /// 새 인증 정보 생성
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &MASKED)
            .finish()
    }
}

// ============================================================================
// TlsOptions - TLS 설정
// ============================================================================

/// 노드 인증서 신뢰 저장소
#[derive(Clone, PartialEq, Eq)]
pub struct TrustStore {
    /// 저장소 경로
    pub path: String,
    /// 저장소 비밀번호
    pub password: String,
}

impl fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustStore")
            .field("path", &self.path)
            .field("password", &MASKED)
            .finish()
    }
}

/// 클라이언트 TLS 설정
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsOptions {
    /// TLS 암호화
    pub enabled: bool,
    /// 신뢰 저장소 (`None`이면 시스템 인증서)
    pub trust_store: Option<TrustStore>,
}

// ============================================================================
// ClusterTopology - 클러스터 토폴로지
// ============================================================================

/// `"default"` 핸들의 데이터센터 간 로드 밸런싱
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusterTopology {
    /// 로컬 데이터센터 우선, 원격으로 제한된 페일오버
    #[default]
    HighAvailability,
    /// 로컬 데이터센터만
    SingleDatacenter,
}

impl ClusterTopology {
    /// 짧은 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighAvailability => "HA",
            Self::SingleDatacenter => "SINGLE_DC",
        }
    }
}

impl fmt::Display for ClusterTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ConnectionLimit - 호스트별 연결 수
// ============================================================================

/// 호스트별 연결 수
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionLimit {
    /// 기본 연결 수
    pub min: u32,
    /// 최대 연결 수
    pub max: u32,
}

impl ConnectionLimit {
    /// 새 제한 생성
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

impl fmt::Display for ConnectionLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.min, self.max)
    }
}

// ============================================================================
// DriverConfig - 드라이버 설정
// ============================================================================

/// 드라이버 설정
///
/// [`DriverConfig::builder`]로 만들고 [`Driver`]가 연결하기 전에
/// [`DriverConfig::validate`]로 검사합니다. 비밀 값은 `Debug` 출력에서 가려집니다.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// 인증 정보
    pub credentials: Option<Credentials>,
    /// 시드 호스트
    pub contact_points: Vec<String>,
    /// 네이티브 프로토콜 포트
    pub port: u16,
    /// 기본 키스페이스
    pub keyspace: String,
    /// `"default"` 핸들의 로컬 데이터센터
    pub local_datacenter: String,
    /// `"default"` 핸들의 로드 밸런싱 방식
    pub topology: ClusterTopology,
    /// HA 모드의 원격 DC별 호스트 수
    pub remote_hosts_per_datacenter: u32,
    /// 로컬 호스트 연결 수
    pub local_connections: ConnectionLimit,
    /// 원격 호스트 연결 수
    pub remote_connections: ConnectionLimit,
    /// 소켓 읽기 타임아웃
    pub read_timeout: Duration,
    /// 연결 타임아웃 (핸들 생성에도 적용)
    pub connect_timeout: Duration,
    /// 재연결 백오프 시작값
    pub reconnection_base_delay: Duration,
    /// 재연결 백오프 최대값
    pub reconnection_max_delay: Duration,
    /// 추측 실행 지연
    pub speculative_delay: Duration,
    /// 최대 추측 실행 수
    pub speculative_attempts: u32,
    /// 오버라이드가 없을 때의 일관성
    pub default_consistency: ConsistencyLevel,
    /// 라우팅 오버라이드 테이블 사용
    pub routing_overrides_enabled: bool,
    /// 라우팅 오버라이드 테이블 이름
    pub routing_table_name: String,
    /// 캐시된 오버라이드 갱신 주기 (`None`이면 갱신 안 함)
    pub override_ttl: Option<Duration>,
    /// 텍스트 검색 허용
    pub search_enabled: bool,
    /// 텍스트 검색 데이터센터
    pub search_datacenter: String,
    /// 저장 시 Null 컬럼 기록
    pub save_nulls: bool,
    /// TLS
    pub tls: TlsOptions,
}

impl DriverConfig {
    /// 기본 접속 호스트
    pub const DEFAULT_CONTACT_POINT: &'static str = "localhost";
    /// 기본 포트
    pub const DEFAULT_PORT: u16 = 9042;
    /// 기본 검색 데이터센터
    pub const DEFAULT_SEARCH_DATACENTER: &'static str = "search";

    /// 빌더 시작
    pub fn builder() -> DriverConfigBuilder {
        DriverConfigBuilder {
            config: Self::default(),
        }
    }

    /// 설정 검사
    ///
    /// 접속 호스트, 키스페이스, 로컬 데이터센터 순으로 필수 값을 확인하고
    /// 처음 빠진 값을 보고합니다.
    pub fn validate(&self) -> DriverResult<()> {
        debug!("Validating configuration: {:?}", self);

        if self.contact_points.iter().all(|p| p.trim().is_empty()) {
            return Err(DriverError::configuration("Contact points are required"));
        }
        if self.keyspace.trim().is_empty() {
            return Err(DriverError::configuration("Keyspace is required"));
        }
        if self.local_datacenter.trim().is_empty() {
            return Err(DriverError::configuration("Local datacenter is required"));
        }

        if self.port == 0 {
            return Err(DriverError::configuration("Port must be non-zero"));
        }
        for (name, limit) in [
            ("Local", self.local_connections),
            ("Remote", self.remote_connections),
        ] {
            if limit.min > limit.max {
                return Err(DriverError::configuration(format!(
                    "{} connection limit min {} exceeds max {}",
                    name, limit.min, limit.max
                )));
            }
        }
        if self.reconnection_base_delay > self.reconnection_max_delay {
            return Err(DriverError::configuration(
                "Reconnection base delay exceeds max delay",
            ));
        }
        if self.routing_overrides_enabled && self.routing_table_name.trim().is_empty() {
            return Err(DriverError::configuration(
                "Routing table name is required when routing overrides are enabled",
            ));
        }
        if self.search_enabled && self.search_datacenter.trim().is_empty() {
            return Err(DriverError::configuration(
                "Search datacenter is required when search is enabled",
            ));
        }
        if let Some(store) = &self.tls.trust_store {
            if store.path.trim().is_empty() {
                return Err(DriverError::configuration("Trust store path is empty"));
            }
        }

        Ok(())
    }

    /// 라우팅 관리 테이블
    pub fn routing_table(&self) -> TableRef {
        TableRef::new(&self.keyspace, &self.routing_table_name)
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            contact_points: vec![Self::DEFAULT_CONTACT_POINT.to_string()],
            port: Self::DEFAULT_PORT,
            keyspace: String::new(),
            local_datacenter: String::new(),
            topology: ClusterTopology::HighAvailability,
            remote_hosts_per_datacenter: 2,
            local_connections: ConnectionLimit::new(1, 3),
            remote_connections: ConnectionLimit::new(1, 1),
            read_timeout: Duration::from_millis(500),
            connect_timeout: Duration::from_millis(12_000),
            reconnection_base_delay: Duration::from_millis(500),
            reconnection_max_delay: Duration::from_millis(300_000),
            speculative_delay: Duration::from_millis(500),
            speculative_attempts: 2,
            default_consistency: ConsistencyLevel::LocalQuorum,
            routing_overrides_enabled: true,
            routing_table_name: DEFAULT_ROUTING_TABLE.to_string(),
            override_ttl: None,
            search_enabled: true,
            search_datacenter: Self::DEFAULT_SEARCH_DATACENTER.to_string(),
            save_nulls: false,
            tls: TlsOptions::default(),
        }
    }
}

// ============================================================================
// DriverConfigBuilder - 설정 빌더
// ============================================================================

/// 드라이버 설정 빌더
pub struct DriverConfigBuilder {
    config: DriverConfig,
}

impl DriverConfigBuilder {
    /// 인증 정보 설정
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.config.credentials = Some(Credentials::new(username, password));
        self
    }

    /// 시드 호스트 설정 (쉼표 구분)
    pub fn with_contact_points(mut self, contact_points: &str) -> Self {
        self.config.contact_points = contact_points
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    /// 포트 설정
    pub fn with_port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// 키스페이스 설정
    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.config.keyspace = keyspace.into();
        self
    }

    /// 로컬 데이터센터 설정
    pub fn with_local_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.config.local_datacenter = datacenter.into();
        self
    }

    /// 토폴로지 설정
    pub fn with_topology(mut self, topology: ClusterTopology) -> Self {
        self.config.topology = topology;
        self
    }

    /// 로컬 데이터센터만 사용
    pub fn with_single_dc_cluster(self) -> Self {
        self.with_topology(ClusterTopology::SingleDatacenter)
    }

    /// 원격 페일오버 사용
    pub fn with_ha_cluster(self) -> Self {
        self.with_topology(ClusterTopology::HighAvailability)
    }

    /// 원격 DC별 호스트 수 설정
    pub fn with_remote_hosts_per_datacenter(mut self, hosts: u32) -> Self {
        self.config.remote_hosts_per_datacenter = hosts;
        self
    }

    /// 로컬 호스트 연결 수 설정
    pub fn with_local_connection_limit(mut self, min: u32, max: u32) -> Self {
        self.config.local_connections = ConnectionLimit::new(min, max);
        self
    }

    /// 원격 호스트 연결 수 설정
    pub fn with_remote_connection_limit(mut self, min: u32, max: u32) -> Self {
        self.config.remote_connections = ConnectionLimit::new(min, max);
        self
    }

    /// 추측 실행 설정
    pub fn with_speculative_execution(mut self, delay: Duration, attempts: u32) -> Self {
        self.config.speculative_delay = delay;
        self.config.speculative_attempts = attempts;
        self
    }

    /// 재연결 백오프 설정
    pub fn with_reconnection(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.config.reconnection_base_delay = base_delay;
        self.config.reconnection_max_delay = max_delay;
        self
    }

    /// 읽기 타임아웃 설정
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// 연결 타임아웃 설정
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// 기본 일관성 설정
    pub fn with_default_consistency(mut self, consistency: ConsistencyLevel) -> Self {
        self.config.default_consistency = consistency;
        self
    }

    /// 오버라이드 사용
    pub fn with_routing_overrides(mut self) -> Self {
        self.config.routing_overrides_enabled = true;
        self
    }

    /// 오버라이드 사용 안 함
    pub fn without_routing_overrides(mut self) -> Self {
        self.config.routing_overrides_enabled = false;
        self
    }

    /// 오버라이드 테이블 이름 설정
    pub fn with_routing_table(mut self, table: impl Into<String>) -> Self {
        self.config.routing_table_name = table.into();
        self
    }

    /// 오버라이드 캐시 TTL 설정
    pub fn with_override_ttl(mut self, ttl: Duration) -> Self {
        self.config.override_ttl = Some(ttl);
        self
    }

    /// 검색 허용
    pub fn with_search(mut self) -> Self {
        self.config.search_enabled = true;
        self
    }

    /// 검색 비활성화
    pub fn without_search(mut self) -> Self {
        self.config.search_enabled = false;
        self
    }

    /// 검색 데이터센터 설정
    pub fn with_search_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.config.search_datacenter = datacenter.into();
        self
    }

    /// Null 컬럼 저장
    pub fn with_save_nulls(mut self) -> Self {
        self.config.save_nulls = true;
        self
    }

    /// Null 컬럼 제외
    pub fn without_save_nulls(mut self) -> Self {
        self.config.save_nulls = false;
        self
    }

    /// TLS 사용
    pub fn with_tls(mut self) -> Self {
        self.config.tls.enabled = true;
        self
    }

    /// TLS 사용 안 함
    pub fn without_tls(mut self) -> Self {
        self.config.tls.enabled = false;
        self
    }

    /// 신뢰 저장소 설정
    pub fn with_trust_store(mut self, path: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.tls.trust_store = Some(TrustStore {
            path: path.into(),
            password: password.into(),
        });
        self
    }

    /// 빌드
    pub fn build(self) -> DriverConfig {
        self.config
    }
}

// ============================================================================
// PendingWrite - 비동기 쓰기
// ============================================================================

/// 진행 중인 비동기 쓰기
///
/// await하면 쓰기 결과를 받습니다. drop해도 쓰기는 취소되지 않습니다.
#[derive(Debug)]
pub struct PendingWrite {
    inner: JoinHandle<DriverResult<()>>,
}

impl PendingWrite {
    fn spawn<F>(write: F) -> Self
    where
        F: Future<Output = DriverResult<()>> + Send + 'static,
    {
        Self {
            inner: tokio::spawn(write),
        }
    }

    /// 완료 여부
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl Future for PendingWrite {
    type Output = DriverResult<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.inner).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) => Poll::Ready(Err(e.into())),
            Poll::Pending => Poll::Pending,
        }
    }
}

// ============================================================================
// Driver - 드라이버
// ============================================================================

/// 데이터센터 인식 CRUD 드라이버
///
/// 모든 작업은 엔티티 테이블의 라우팅 키와 일관성을 결정한 뒤
/// 해당 키의 캐시된 핸들로 문장을 보냅니다.
pub struct Driver {
    /// 설정
    config: Arc<DriverConfig>,
    /// 라우팅 키별 핸들
    registry: Arc<ConnectionRegistry>,
    /// 오버라이드 캐시
    cache: Arc<RoutingTableCache>,
    /// 라우팅 결정기
    resolver: RoutingResolver,
    /// 열림 여부
    open: RwLock<bool>,
}

impl Driver {
    /// 새 드라이버 생성 (설정된 관리 테이블에서 오버라이드 조회)
    pub fn new(config: DriverConfig, provider: Arc<dyn TransportProvider>) -> DriverResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let registry = Arc::new(ConnectionRegistry::new(config.clone(), provider));
        let store = Arc::new(RegistryRoutingStore::new(
            registry.clone(),
            config.routing_table(),
            config.default_consistency,
        ));
        Ok(Self::assemble(config, registry, store))
    }

    /// `store`에서 오버라이드를 읽는 드라이버 생성
    pub fn with_routing_store(
        config: DriverConfig,
        provider: Arc<dyn TransportProvider>,
        store: Arc<dyn RoutingTableStore>,
    ) -> DriverResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let registry = Arc::new(ConnectionRegistry::new(config.clone(), provider));
        Ok(Self::assemble(config, registry, store))
    }

    fn assemble(
        config: Arc<DriverConfig>,
        registry: Arc<ConnectionRegistry>,
        store: Arc<dyn RoutingTableStore>,
    ) -> Self {
        let cache = Arc::new(RoutingTableCache::new(store, config.override_ttl));
        let resolver = RoutingResolver::new(cache.clone(), &config);

        info!(
            "Driver configured for keyspace {} (local DC {}, {})",
            config.keyspace, config.local_datacenter, config.topology
        );

        Self {
            config,
            registry,
            cache,
            resolver,
            open: RwLock::new(true),
        }
    }

    /// 설정 조회
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// 열림 여부
    pub fn is_open(&self) -> bool {
        *self.open.read()
    }

    /// `table`의 라우팅 결정
    pub async fn route(&self, table: &str, operation: OperationKind) -> DriverResult<Route> {
        self.ensure_open()?;
        self.resolver.resolve(table, operation).await
    }

    /// `T` 테이블의 라우팅 결정
    pub async fn route_for<T: Entity>(&self, operation: OperationKind) -> DriverResult<Route> {
        self.route(T::DESCRIPTOR.table, operation).await
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// 전체 기본 키로 단건 조회
    pub async fn get_by_id<T: Entity>(&self, entity: &T) -> DriverResult<Option<T>> {
        let row = self.fetch_by_id(entity).await?;
        row.map(|row| T::from_row(&row)).transpose()
    }

    /// 전체 기본 키로 존재 여부 확인
    pub async fn exists_by_id<T: Entity>(&self, entity: &T) -> DriverResult<bool> {
        Ok(self.fetch_by_id(entity).await?.is_some())
    }

    /// 채워진 키 필드로 첫 행 조회
    pub async fn get_one_by_id<T: Entity>(&self, entity: &T) -> DriverResult<Option<T>> {
        let route = self.route_for::<T>(OperationKind::Read).await?;
        let filter = KeyFilter::from_entity(entity)?;
        let select = Select::new(self.table_of::<T>(), filter, route.consistency).with_limit(1);
        debug!("Getting one from {} on {}: {}", select.table, route, select.to_cql());

        let handle = self.handle(&route.routing_key).await?;
        let rows = handle.select(&select).await?;
        rows.first().map(T::from_row).transpose()
    }

    /// 채워진 키 필드로 전체 행 조회
    pub async fn get_all_by_id<T: Entity>(&self, entity: &T) -> DriverResult<Vec<T>> {
        let route = self.route_for::<T>(OperationKind::Read).await?;
        let filter = KeyFilter::from_entity(entity)?;
        let select = Select::new(self.table_of::<T>(), filter, route.consistency);
        debug!("Getting all from {} on {}: {}", select.table, route, select.to_cql());

        let handle = self.handle(&route.routing_key).await?;
        let rows = handle.select(&select).await?;
        rows.iter().map(T::from_row).collect()
    }

    async fn fetch_by_id<T: Entity>(&self, entity: &T) -> DriverResult<Option<Row>> {
        let route = self.route_for::<T>(OperationKind::Read).await?;
        let key = KeyFilter::primary_key(entity)?;
        let select = Select::new(self.table_of::<T>(), key, route.consistency);
        debug!(
            "Getting {} {} on {}",
            select.table, select.filter, route
        );

        let handle = self.handle(&route.routing_key).await?;
        handle.fetch(&select).await
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// 엔티티 저장
    pub async fn save<T: Entity>(&self, entity: &T) -> DriverResult<()> {
        let (handle, upsert) = self.prepare_save(entity).await?;
        handle.upsert(&upsert).await
    }

    /// 비동기 저장 시작
    pub async fn save_async<T: Entity>(&self, entity: &T) -> DriverResult<PendingWrite> {
        let (handle, upsert) = self.prepare_save(entity).await?;
        Ok(PendingWrite::spawn(async move { handle.upsert(&upsert).await }))
    }

    /// 전체 기본 키로 삭제
    pub async fn delete<T: Entity>(&self, entity: &T) -> DriverResult<()> {
        let (handle, delete) = self.prepare_delete(entity).await?;
        handle.delete(&delete).await
    }

    /// 비동기 삭제 시작
    pub async fn delete_async<T: Entity>(&self, entity: &T) -> DriverResult<PendingWrite> {
        let (handle, delete) = self.prepare_delete(entity).await?;
        Ok(PendingWrite::spawn(async move { handle.delete(&delete).await }))
    }

    async fn prepare_save<T: Entity>(
        &self,
        entity: &T,
    ) -> DriverResult<(Arc<dyn TransportHandle>, Upsert)> {
        let route = self.route_for::<T>(OperationKind::Write).await?;
        let upsert = Upsert::from_entity(
            entity,
            self.table_of::<T>(),
            route.consistency,
            self.config.save_nulls,
        )?;
        debug!("Saving {} {} on {}: {}", upsert.table, upsert.key, route, upsert.to_cql());

        let handle = self.handle(&route.routing_key).await?;
        Ok((handle, upsert))
    }

    async fn prepare_delete<T: Entity>(
        &self,
        entity: &T,
    ) -> DriverResult<(Arc<dyn TransportHandle>, Delete)> {
        let route = self.route_for::<T>(OperationKind::Write).await?;
        let delete = Delete::from_entity(entity, self.table_of::<T>(), route.consistency)?;
        debug!("Deleting {} {} on {}", delete.table, delete.key, route);

        let handle = self.handle(&route.routing_key).await?;
        Ok((handle, delete))
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// 텍스트 검색 (최대 10행)
    pub async fn get_all_by_search<T: Entity>(&self, query: &str) -> DriverResult<Vec<T>> {
        self.get_all_by_search_with_limit(query, DEFAULT_SEARCH_LIMIT)
            .await
    }

    /// 텍스트 검색 (최대 `limit`행)
    pub async fn get_all_by_search_with_limit<T: Entity>(
        &self,
        query: &str,
        limit: i32,
    ) -> DriverResult<Vec<T>> {
        self.ensure_open()?;
        self.ensure_search()?;
        if limit <= 0 {
            return Err(DriverError::invalid_argument(format!(
                "Search limit must be positive, got {}",
                limit
            )));
        }

        let search = SearchQuery::new(self.table_of::<T>(), query).with_limit(limit);
        let key = self.search_key();
        debug!("Searching {} on {}: {}", search.table, key, search.to_cql());

        let handle = self.handle(&key).await?;
        let rows = handle.search(&search).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// 텍스트 검색 카운트
    pub async fn get_count_by_search<T: Entity>(&self, query: &str) -> DriverResult<i64> {
        self.ensure_open()?;
        self.ensure_search()?;

        let search = SearchQuery::new(self.table_of::<T>(), query);
        let key = self.search_key();
        debug!("Counting {} on {}: {}", search.table, key, search.to_count_cql());

        let handle = self.handle(&key).await?;
        Ok(handle.count(&search).await?.unwrap_or(0))
    }

    // ------------------------------------------------------------------------
    // Raw CQL
    // ------------------------------------------------------------------------

    /// `"default"` 핸들에서 CQL 실행
    ///
    /// 오버라이드와 일관성은 적용되지 않습니다.
    pub async fn execute(&self, cql: &str) -> DriverResult<Vec<Row>> {
        self.ensure_open()?;
        let key = RoutingKey::default_key();
        debug!("Executing {} on {}", cql, key);

        let handle = self.handle(&key).await?;
        handle.execute(cql, None).await
    }

    /// `T` 테이블의 읽기 라우팅으로 CQL 실행 후 첫 행 매핑
    ///
    /// 라우팅 키만 결정하고 오버라이드 일관성은 적용하지 않습니다.
    pub async fn execute_one<T: Entity>(&self, cql: &str) -> DriverResult<Option<T>> {
        let rows = self.execute_on_table_route::<T>(cql).await?;
        rows.first().map(T::from_row).transpose()
    }

    /// `T` 테이블의 읽기 라우팅으로 CQL 실행 후 전체 행 매핑
    pub async fn execute_all<T: Entity>(&self, cql: &str) -> DriverResult<Vec<T>> {
        let rows = self.execute_on_table_route::<T>(cql).await?;
        rows.iter().map(T::from_row).collect()
    }

    async fn execute_on_table_route<T: Entity>(&self, cql: &str) -> DriverResult<Vec<Row>> {
        let route = self.route_for::<T>(OperationKind::Read).await?;
        debug!("Executing {} on {}", cql, route.routing_key);

        let handle = self.handle(&route.routing_key).await?;
        handle.execute(cql, None).await
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// `table` 오버라이드 캐시 무효화
    pub fn invalidate_route(&self, table: &str) {
        self.cache.invalidate(table);
    }

    /// 전체 오버라이드 캐시 무효화
    pub fn invalidate_routes(&self) {
        self.cache.invalidate_all();
    }

    /// 드라이버 닫기
    ///
    /// 여러 번 호출해도 안전하며, 이후 작업은 [`DriverError::Closed`]로 실패합니다.
    pub async fn close(&self) -> DriverResult<()> {
        {
            let mut open = self.open.write();
            if !*open {
                return Ok(());
            }
            *open = false;
        }

        info!("Closing driver");
        self.registry.close().await
    }

    /// 메트릭 조회
    pub fn metrics(&self) -> DriverMetrics {
        let registry = self.registry.metrics();
        let cache = self.cache.metrics();
        DriverMetrics {
            open_handles: registry.open_handles,
            total_handles_created: registry.total_created,
            failed_handle_constructions: registry.total_failed,
            override_cache_hits: cache.hits,
            override_cache_misses: cache.misses,
        }
    }

    fn ensure_open(&self) -> DriverResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(DriverError::Closed)
        }
    }

    fn ensure_search(&self) -> DriverResult<()> {
        if self.config.search_enabled {
            Ok(())
        } else {
            Err(DriverError::feature_disabled("Search is disabled"))
        }
    }

    fn search_key(&self) -> RoutingKey {
        RoutingKey::new(self.config.search_datacenter.as_str())
    }

    fn table_of<T: Entity>(&self) -> TableRef {
        TableRef::of::<T>(&self.config.keyspace)
    }

    async fn handle(&self, key: &RoutingKey) -> DriverResult<Arc<dyn TransportHandle>> {
        self.registry.handle_for(key).await
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("keyspace", &self.config.keyspace)
            .field("local_datacenter", &self.config.local_datacenter)
            .field("open", &self.is_open())
            .finish()
    }
}

// ============================================================================
// DriverMetrics - 드라이버 메트릭
// ============================================================================

/// 드라이버 메트릭
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverMetrics {
    /// 캐시된 핸들 수
    pub open_handles: usize,
    /// 생성된 핸들 수
    pub total_handles_created: u64,
    /// 핸들 생성 실패 수
    pub failed_handle_constructions: u64,
    /// 오버라이드 캐시 적중
    pub override_cache_hits: u64,
    /// 오버라이드 저장소 조회
    pub override_cache_misses: u64,
}

// ============================================================================
// Tests
// ============================================================================
