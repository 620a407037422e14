//! 라우팅 오버라이드 테이블
//!
//! 관리 테이블에 저장된 테이블별 데이터센터/일관성 오버라이드를 키 단위 캐시로 조회합니다.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::super::entity::{EntityDescriptor, KeyColumn};
use super::super::error::DriverResult;
use super::super::filter::KeyFilter;
use super::super::pool::{ConnectionRegistry, RoutingKey};
use super::super::record::Row;
use super::super::statement::{Select, TableRef};
use super::super::types::{ConsistencyLevel, Value};

/// 기본 오버라이드 레코드의 테이블 이름
pub const DEFAULT_OVERRIDE_KEY: &str = "default";

/// 관리 테이블 기본 이름
pub const DEFAULT_ROUTING_TABLE: &str = "driver_config";

// ============================================================================
// RoutingOverride - 오버라이드 레코드
// ============================================================================

/// 관리 테이블의 한 행
///
/// 일관성 값은 저장된 문자열 그대로 보관하고, 해석은 라우팅 결정 시점에 합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingOverride {
    /// 대상 테이블 또는 `"default"`
    pub table_name: String,
    /// 라우팅할 데이터센터
    pub datacenter: String,
    /// 읽기 일관성
    pub read_consistency: String,
    /// 쓰기 일관성
    pub write_consistency: String,
}

impl RoutingOverride {
    /// 새 레코드 생성
    pub fn new(
        table_name: impl Into<String>,
        datacenter: impl Into<String>,
        read_consistency: impl Into<String>,
        write_consistency: impl Into<String>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            datacenter: datacenter.into(),
            read_consistency: read_consistency.into(),
            write_consistency: write_consistency.into(),
        }
    }

    /// 관리 테이블 행에서 생성
    pub fn from_row(row: &Row) -> DriverResult<Self> {
        Ok(Self {
            table_name: row.get_string("table_name")?,
            datacenter: row.get_string("data_center")?,
            read_consistency: row.get_string("read_consistency")?,
            write_consistency: row.get_string("write_consistency")?,
        })
    }

    /// 기본 레코드 여부
    pub fn is_default(&self) -> bool {
        self.table_name == DEFAULT_OVERRIDE_KEY
    }
}

impl fmt::Display for RoutingOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} (read {}, write {})",
            self.table_name, self.datacenter, self.read_consistency, self.write_consistency
        )
    }
}

// ============================================================================
// RoutingTableStore - 오버라이드 저장소
// ============================================================================

/// 오버라이드 레코드 저장소
#[async_trait]
pub trait RoutingTableStore: Send + Sync {
    /// `table_name`의 레코드 조회
    async fn fetch(&self, table_name: &str) -> DriverResult<Option<RoutingOverride>>;
}

const ROUTING_TABLE_KEY: &[KeyColumn] = &[KeyColumn::named("table_name")];
const ROUTING_TABLE_DESCRIPTOR: EntityDescriptor =
    EntityDescriptor::new(DEFAULT_ROUTING_TABLE, ROUTING_TABLE_KEY, &[]);

/// `"default"` 핸들로 관리 테이블을 읽는 저장소
pub struct RegistryRoutingStore {
    registry: Arc<ConnectionRegistry>,
    table: TableRef,
    consistency: ConsistencyLevel,
}

impl RegistryRoutingStore {
    /// 새 저장소 생성
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        table: TableRef,
        consistency: ConsistencyLevel,
    ) -> Self {
        Self {
            registry,
            table,
            consistency,
        }
    }

    /// 관리 테이블
    pub fn table(&self) -> &TableRef {
        &self.table
    }
}

#[async_trait]
impl RoutingTableStore for RegistryRoutingStore {
    async fn fetch(&self, table_name: &str) -> DriverResult<Option<RoutingOverride>> {
        let filter =
            KeyFilter::build_full(&ROUTING_TABLE_DESCRIPTOR, |_| Some(Value::from(table_name)))?;
        let select = Select::new(self.table.clone(), filter, self.consistency).with_limit(1);
        debug!("{}", select.to_cql());

        let handle = self.registry.handle_for(&RoutingKey::default_key()).await?;
        match handle.fetch(&select).await? {
            Some(row) => Ok(Some(RoutingOverride::from_row(&row)?)),
            None => Ok(None),
        }
    }
}

// ============================================================================
// RoutingTableCache - 오버라이드 캐시
// ============================================================================

/// 캐시 메트릭
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    /// 캐시 적중
    pub hits: u64,
    /// 저장소 조회
    pub misses: u64,
    /// 저장소 조회 실패
    pub load_failures: u64,
}

#[derive(Debug, Clone)]
struct CachedOverride {
    value: Option<RoutingOverride>,
    loaded_at: Instant,
}

type LoadGate = Arc<tokio::sync::Mutex<()>>;

/// 테이블 이름별 오버라이드 읽기 캐시
///
/// 없음 결과도 캐시합니다. 무효화되거나 TTL이 지나기 전까지 유지되며,
/// 저장소 오류는 "없음"으로 처리하고 캐시하지 않습니다.
pub struct RoutingTableCache {
    store: Arc<dyn RoutingTableStore>,
    ttl: Option<Duration>,
    entries: RwLock<HashMap<String, CachedOverride>>,
    /// 무효화 세대; `entries` 쓰기 잠금 안에서만 변경
    epoch: AtomicU64,
    /// 키별 로드 게이트
    gates: Mutex<HashMap<String, LoadGate>>,
    hits: AtomicU64,
    misses: AtomicU64,
    load_failures: AtomicU64,
}

impl RoutingTableCache {
    /// 새 캐시 생성 (`ttl`이 `None`이면 갱신하지 않음)
    pub fn new(store: Arc<dyn RoutingTableStore>, ttl: Option<Duration>) -> Self {
        Self {
            store,
            ttl,
            entries: RwLock::new(HashMap::new()),
            epoch: AtomicU64::new(0),
            gates: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            load_failures: AtomicU64::new(0),
        }
    }

    /// 오버라이드 조회, 캐시에 없으면 저장소에서 로드
    pub async fn lookup(&self, table_name: &str) -> Option<RoutingOverride> {
        if let Some(value) = self.cached(table_name) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return value;
        }

        let gate = self.gate_for(table_name);
        let value = {
            let _guard = gate.lock().await;
            self.load(table_name).await
        };
        self.release_gate(table_name, gate);
        value
    }

    /// `table_name` 항목 무효화
    ///
    /// 진행 중인 로드의 결과도 캐시되지 않습니다.
    pub fn invalidate(&self, table_name: &str) {
        let mut entries = self.entries.write();
        entries.remove(table_name);
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// 전체 무효화
    pub fn invalidate_all(&self) {
        let mut entries = self.entries.write();
        entries.clear();
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// 캐시 항목 수
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// 비어 있는지 확인
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// TTL
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// 메트릭 조회
    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
        }
    }

    /// 게이트를 잡은 상태에서 호출
    async fn load(&self, table_name: &str) -> Option<RoutingOverride> {
        // 대기하는 동안 다른 호출이 로드했을 수 있음
        if let Some(value) = self.cached(table_name) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return value;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let epoch = self.epoch.load(Ordering::Acquire);

        match self.store.fetch(table_name).await {
            Ok(value) => {
                debug!(
                    "Loaded routing override for {}: {}",
                    table_name,
                    value
                        .as_ref()
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "none".to_string())
                );

                let mut entries = self.entries.write();
                if self.epoch.load(Ordering::Acquire) == epoch {
                    entries.insert(
                        table_name.to_string(),
                        CachedOverride {
                            value: value.clone(),
                            loaded_at: Instant::now(),
                        },
                    );
                } else {
                    debug!(
                        "Routing override for {} invalidated during load, not cached",
                        table_name
                    );
                }
                value
            }
            Err(e) => {
                self.load_failures.fetch_add(1, Ordering::Relaxed);
                warn!("Routing override lookup for {} failed: {}", table_name, e);
                None
            }
        }
    }

    /// 유효한 캐시 값 (바깥 `None`은 캐시 없음)
    fn cached(&self, table_name: &str) -> Option<Option<RoutingOverride>> {
        let entries = self.entries.read();
        let entry = entries.get(table_name)?;
        if self.is_expired(entry) {
            return None;
        }
        Some(entry.value.clone())
    }

    fn is_expired(&self, entry: &CachedOverride) -> bool {
        match self.ttl {
            Some(ttl) => entry.loaded_at.elapsed() >= ttl,
            None => false,
        }
    }

    fn gate_for(&self, table_name: &str) -> LoadGate {
        self.gates
            .lock()
            .entry(table_name.to_string())
            .or_default()
            .clone()
    }

    /// 맵과 호출자 외에 보유자가 없으면 게이트 제거
    fn release_gate(&self, table_name: &str, gate: LoadGate) {
        let mut gates = self.gates.lock();
        if Arc::strong_count(&gate) == 2 {
            gates.remove(table_name);
        }
    }

    #[cfg(test)]
    fn gate_count(&self) -> usize {
        self.gates.lock().len()
    }
}

impl fmt::Debug for RoutingTableCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingTableCache")
            .field("entries", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
