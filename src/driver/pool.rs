//! Connection Registry
//!
//! 라우팅 키별 트랜스포트 핸들 관리
//!
//! 핸들은 처음 사용할 때 생성되어 종료까지 유지됩니다. 키마다 [`OnceCell`]을 두어
//! 같은 키의 동시 첫 호출은 하나의 핸들만 생성하고, 다른 키는 서로 기다리지 않습니다.
//! 맵 잠금은 셀 조회/삽입에만 사용하고 생성 중에는 잡지 않습니다.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::driver::DriverConfig;
use super::error::{DriverError, DriverResult};
use super::transport::{ConnectionTarget, TransportHandle, TransportProvider};

/// 설정된 토폴로지를 사용하는 라우팅 키 이름
pub const DEFAULT_ROUTING_KEY: &str = "default";

// ============================================================================
// RoutingKey - 라우팅 키
// ============================================================================

/// `"default"` 또는 데이터센터 이름 (대소문자 구분)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutingKey(String);

impl RoutingKey {
    /// 새 키 생성
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// `"default"` 키
    pub fn default_key() -> Self {
        Self(DEFAULT_ROUTING_KEY.to_string())
    }

    /// `"default"` 키 여부
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_ROUTING_KEY
    }

    /// 문자열로 반환
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RoutingKey {
    fn default() -> Self {
        Self::default_key()
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoutingKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RoutingKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// RegistryMetrics - 레지스트리 메트릭
// ============================================================================

/// 레지스트리 카운터
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryMetrics {
    /// 현재 캐시된 핸들 수
    pub open_handles: usize,
    /// 생성된 핸들 수
    pub total_created: u64,
    /// 생성 실패 수
    pub total_failed: u64,
    /// 종료 시 닫은 핸들 수
    pub total_closed: u64,
}

// ============================================================================
// ConnectionRegistry - 연결 레지스트리
// ============================================================================

type HandleCell = Arc<OnceCell<Arc<dyn TransportHandle>>>;

/// 키별 트랜스포트 핸들 캐시
pub struct ConnectionRegistry {
    /// 프로바이더에 전달할 설정
    config: Arc<DriverConfig>,
    /// 핸들 생성기
    provider: Arc<dyn TransportProvider>,
    /// 요청된 키별 셀
    cells: Mutex<HashMap<RoutingKey, HandleCell>>,
    /// 종료 시작 여부
    closed: AtomicBool,
    /// 생성 수
    total_created: AtomicU64,
    /// 실패 수
    total_failed: AtomicU64,
    /// 닫은 수
    total_closed: AtomicU64,
}

impl ConnectionRegistry {
    /// 새 레지스트리 생성
    pub fn new(config: Arc<DriverConfig>, provider: Arc<dyn TransportProvider>) -> Self {
        Self {
            config,
            provider,
            cells: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            total_created: AtomicU64::new(0),
            total_failed: AtomicU64::new(0),
            total_closed: AtomicU64::new(0),
        }
    }

    /// `key`의 핸들 조회, 없으면 생성
    ///
    /// 생성에 실패하면 캐시하지 않으므로 다음 호출에서 다시 시도합니다.
    pub async fn handle_for(&self, key: &RoutingKey) -> DriverResult<Arc<dyn TransportHandle>> {
        self.ensure_open()?;

        let cell = self.cell_for(key)?;
        if let Some(handle) = cell.get() {
            return Ok(handle.clone());
        }

        let handle = cell
            .get_or_try_init(|| self.construct(key))
            .await?;
        Ok(handle.clone())
    }

    /// `key`의 핸들 캐시 여부
    pub fn is_cached(&self, key: &RoutingKey) -> bool {
        self.cells
            .lock()
            .get(key)
            .map(|cell| cell.initialized())
            .unwrap_or(false)
    }

    /// 핸들이 캐시된 키 목록
    pub fn cached_keys(&self) -> Vec<RoutingKey> {
        let mut keys: Vec<RoutingKey> = self
            .cells
            .lock()
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// 종료 여부
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 캐시된 모든 핸들을 한 번씩 닫기
    ///
    /// 여러 번 호출해도 안전합니다. 시작 이후에는 새 핸들을 만들 수 없고, 진행 중인
    /// 생성은 기다린 뒤 함께 닫습니다. 닫기 실패는 로그만 남깁니다.
    pub async fn close(&self) -> DriverResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let cells: Vec<(RoutingKey, HandleCell)> = self.cells.lock().drain().collect();

        for (key, cell) in cells {
            // 진행 중인 생성 대기 (빈 셀은 그대로)
            let handle = cell
                .get_or_try_init(|| async { Err::<Arc<dyn TransportHandle>, _>(DriverError::Closed) })
                .await;

            if let Ok(handle) = handle {
                match handle.close().await {
                    Ok(()) => info!("Closed transport handle for key {}", key),
                    Err(e) => warn!("Failed to close transport handle for key {}: {}", key, e),
                }
                self.total_closed.fetch_add(1, Ordering::Relaxed);
            }
        }

        Ok(())
    }

    /// 메트릭 조회
    pub fn metrics(&self) -> RegistryMetrics {
        RegistryMetrics {
            open_handles: self.cached_keys().len(),
            total_created: self.total_created.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            total_closed: self.total_closed.load(Ordering::Relaxed),
        }
    }

    fn ensure_open(&self) -> DriverResult<()> {
        if self.is_closed() {
            Err(DriverError::Closed)
        } else {
            Ok(())
        }
    }

    fn cell_for(&self, key: &RoutingKey) -> DriverResult<HandleCell> {
        let mut cells = self.cells.lock();
        // 맵 잠금 안에서 확인해야 종료 후 셀이 추가되지 않음
        self.ensure_open()?;
        Ok(cells.entry(key.clone()).or_default().clone())
    }

    async fn construct(&self, key: &RoutingKey) -> DriverResult<Arc<dyn TransportHandle>> {
        self.ensure_open()?;

        let target = ConnectionTarget::for_key(key, &self.config);
        debug!("Opening transport handle for {}", target);

        let opened = tokio::time::timeout(
            self.config.connect_timeout,
            self.provider.open(&target, &self.config),
        )
        .await;

        let result = match opened {
            Ok(Ok(handle)) => Ok(handle),
            Ok(Err(DriverError::Connection(msg))) => Err(DriverError::Connection(msg)),
            Ok(Err(e)) => Err(DriverError::connection(format!(
                "Failed to open transport for key {}: {}",
                key, e
            ))),
            Err(_) => Err(DriverError::connection(format!(
                "Timed out after {:?} opening transport for key {}",
                self.config.connect_timeout, key
            ))),
        };

        match &result {
            Ok(_) => {
                self.total_created.fetch_add(1, Ordering::Relaxed);
                info!("Created new transport handle for key {}", key);
            }
            Err(e) => {
                self.total_failed.fetch_add(1, Ordering::Relaxed);
                warn!("Transport construction for key {} failed: {}", key, e);
            }
        }

        result
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("cached_keys", &self.cached_keys())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
