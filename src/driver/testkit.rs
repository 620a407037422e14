//! 테스트용 메모리 트랜스포트와 라우팅 저장소

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::driver::{DriverConfig, DriverConfigBuilder};
use super::entity::{Entity, EntityDescriptor, KeyColumn};
use super::error::{DriverError, DriverResult};
use super::filter::KeyFilter;
use super::record::Row;
use super::routing::{RoutingOverride, RoutingTableStore};
use super::statement::{Delete, SearchQuery, Select, Upsert};
use super::transport::{ConnectionTarget, TransportHandle, TransportProvider};
use super::types::{ConsistencyLevel, Value};

// ============================================================================
// Config - 테스트 설정
// ============================================================================

pub fn test_config_builder() -> DriverConfigBuilder {
    DriverConfig::builder()
        .with_keyspace("shop")
        .with_local_datacenter("dc1")
        .with_connect_timeout(Duration::from_secs(5))
}

pub fn test_config() -> DriverConfig {
    test_config_builder().build()
}

// ============================================================================
// Order - 테스트 엔티티
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Order {
    pub customer_id: Option<String>,
    pub order_id: Option<i64>,
    pub status: Option<String>,
    pub note: Option<String>,
}

pub fn order(customer: Option<&str>, order_id: Option<i64>) -> Order {
    Order {
        customer_id: customer.map(str::to_string),
        order_id,
        status: Some("open".to_string()),
        note: None,
    }
}

impl Entity for Order {
    const DESCRIPTOR: EntityDescriptor = EntityDescriptor::new(
        "orders",
        &[KeyColumn::named("customer_id")],
        &[KeyColumn::named("order_id")],
    );

    fn field(&self, field: &str) -> Option<Value> {
        match field {
            "customer_id" => Some(self.customer_id.clone().into()),
            "order_id" => Some(self.order_id.into()),
            "status" => Some(self.status.clone().into()),
            "note" => Some(self.note.clone().into()),
            _ => None,
        }
    }

    fn to_columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("customer_id", self.customer_id.clone().into()),
            ("order_id", self.order_id.into()),
            ("status", self.status.clone().into()),
            ("note", self.note.clone().into()),
        ]
    }

    fn from_row(row: &Row) -> DriverResult<Self> {
        Ok(Self {
            customer_id: row.get_optional("customer_id")?,
            order_id: row.get_optional("order_id")?,
            status: row.get_optional("status")?,
            note: row.get_optional("note")?,
        })
    }
}

// ============================================================================
// MemoryProvider - 메모리 트랜스포트
// ============================================================================

/// 메모리 핸들이 받은 문장
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub routing_key: String,
    pub cql: String,
    pub consistency: Option<ConsistencyLevel>,
}

#[derive(Debug, Default)]
struct SharedState {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    statements: Mutex<Vec<RecordedStatement>>,
    write_delay: Mutex<Option<Duration>>,
}

impl SharedState {
    fn record(&self, routing_key: &str, cql: String, consistency: Option<ConsistencyLevel>) {
        self.statements.lock().push(RecordedStatement {
            routing_key: routing_key.to_string(),
            cql,
            consistency,
        });
    }

    fn matching(&self, table: &str, filter: &KeyFilter) -> Vec<Row> {
        self.tables
            .lock()
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row_matches(row, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn row_matches(row: &Row, filter: &KeyFilter) -> bool {
    filter
        .predicates()
        .iter()
        .all(|p| row.get(p.column) == Some(&p.value))
}

/// CQL의 `FROM` 뒤 테이블 이름
fn table_in(cql: &str) -> Option<String> {
    let upper = cql.to_uppercase();
    let start = upper.find(" FROM ")? + " FROM ".len();
    let name = cql[start..].split_whitespace().next()?;
    name.rsplit('.').next().map(str::to_string)
}

/// 메모리 테이블 기반 트랜스포트 프로바이더
#[derive(Debug, Default)]
pub struct MemoryProvider {
    shared: Arc<SharedState>,
    opens: Mutex<HashMap<String, usize>>,
    targets: Mutex<Vec<ConnectionTarget>>,
    handles: Mutex<Vec<Arc<MemoryHandle>>>,
    failing: Mutex<Vec<String>>,
    open_delay: Option<Duration>,
    key_delays: HashMap<String, Duration>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    pub fn with_key_delay(mut self, key: &str, delay: Duration) -> Self {
        self.key_delays.insert(key.to_string(), delay);
        self
    }

    pub fn with_write_delay(self, delay: Duration) -> Self {
        *self.shared.write_delay.lock() = Some(delay);
        self
    }

    pub fn fail_key(&self, key: &str) {
        self.failing.lock().push(key.to_string());
    }

    pub fn heal_key(&self, key: &str) {
        self.failing.lock().retain(|k| k != key);
    }

    pub fn add_row(&self, table: &str, row: Row) {
        self.shared
            .tables
            .lock()
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.shared
            .tables
            .lock()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// `key` 생성 시도 수 (실패 포함)
    pub fn open_count(&self, key: &str) -> usize {
        self.opens.lock().get(key).copied().unwrap_or(0)
    }

    pub fn targets(&self) -> Vec<ConnectionTarget> {
        self.targets.lock().clone()
    }

    pub fn handles(&self) -> Vec<Arc<MemoryHandle>> {
        self.handles.lock().clone()
    }

    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.shared.statements.lock().clone()
    }
}

#[async_trait]
impl TransportProvider for MemoryProvider {
    async fn open(
        &self,
        target: &ConnectionTarget,
        _config: &DriverConfig,
    ) -> DriverResult<Arc<dyn TransportHandle>> {
        let key = target.routing_key.as_str().to_string();
        *self.opens.lock().entry(key.clone()).or_default() += 1;
        self.targets.lock().push(target.clone());

        let delay = self.key_delays.get(&key).copied().or(self.open_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().contains(&key) {
            return Err(DriverError::connection(format!("No hosts available in {}", key)));
        }

        let handle = Arc::new(MemoryHandle {
            routing_key: key,
            shared: self.shared.clone(),
            closes: AtomicUsize::new(0),
        });
        self.handles.lock().push(handle.clone());
        Ok(handle)
    }
}

/// 프로바이더 공유 테이블 핸들
#[derive(Debug)]
pub struct MemoryHandle {
    routing_key: String,
    shared: Arc<SharedState>,
    closes: AtomicUsize,
}

impl MemoryHandle {
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    async fn write_delay(&self) {
        let delay = *self.shared.write_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl TransportHandle for MemoryHandle {
    async fn select(&self, select: &Select) -> DriverResult<Vec<Row>> {
        self.shared
            .record(&self.routing_key, select.to_cql(), Some(select.consistency));
        let mut rows = self.shared.matching(&select.table.table, &select.filter);
        if let Some(limit) = select.limit {
            rows.truncate(limit.max(0) as usize);
        }
        Ok(rows)
    }

    async fn upsert(&self, upsert: &Upsert) -> DriverResult<()> {
        self.write_delay().await;
        self.shared
            .record(&self.routing_key, upsert.to_cql(), Some(upsert.consistency));

        let mut tables = self.shared.tables.lock();
        let rows = tables.entry(upsert.table.table.clone()).or_default();
        rows.retain(|row| !row_matches(row, &upsert.key));
        rows.push(Row::from_pairs(upsert.columns.clone()));
        Ok(())
    }

    async fn delete(&self, delete: &Delete) -> DriverResult<()> {
        self.write_delay().await;
        self.shared
            .record(&self.routing_key, delete.to_cql(), Some(delete.consistency));

        if let Some(rows) = self.shared.tables.lock().get_mut(&delete.table.table) {
            rows.retain(|row| !row_matches(row, &delete.key));
        }
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> DriverResult<Vec<Row>> {
        self.shared.record(&self.routing_key, query.to_cql(), None);
        let mut rows = self.shared.matching(&query.table.table, &KeyFilter::new());
        if let Some(limit) = query.limit {
            rows.truncate(limit.max(0) as usize);
        }
        Ok(rows)
    }

    async fn count(&self, query: &SearchQuery) -> DriverResult<Option<i64>> {
        self.shared
            .record(&self.routing_key, query.to_count_cql(), None);
        let rows = self.shared.matching(&query.table.table, &KeyFilter::new());
        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows.len() as i64))
        }
    }

    async fn execute(
        &self,
        cql: &str,
        consistency: Option<ConsistencyLevel>,
    ) -> DriverResult<Vec<Row>> {
        self.shared
            .record(&self.routing_key, cql.to_string(), consistency);
        Ok(table_in(cql)
            .map(|table| self.shared.matching(&table, &KeyFilter::new()))
            .unwrap_or_default())
    }

    async fn close(&self) -> DriverResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// MemoryRoutingStore - 메모리 라우팅 저장소
// ============================================================================

/// 메모리 맵 기반 라우팅 저장소
#[derive(Debug, Default)]
pub struct MemoryRoutingStore {
    records: Mutex<HashMap<String, RoutingOverride>>,
    fetches: Mutex<HashMap<String, usize>>,
    failing: Mutex<bool>,
    delay: Option<Duration>,
}

impl MemoryRoutingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, record: RoutingOverride) -> Self {
        self.insert(record);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert(&self, record: RoutingOverride) {
        self.records
            .lock()
            .insert(record.table_name.clone(), record);
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn fetch_count(&self, table_name: &str) -> usize {
        self.fetches.lock().get(table_name).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().values().sum()
    }
}

#[async_trait]
impl RoutingTableStore for MemoryRoutingStore {
    async fn fetch(&self, table_name: &str) -> DriverResult<Option<RoutingOverride>> {
        *self
            .fetches
            .lock()
            .entry(table_name.to_string())
            .or_default() += 1;

        // 지연 전에 읽음 (느린 조회가 옛 값을 돌려주는 상황)
        let snapshot = self.records.lock().get(table_name).cloned();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if *self.failing.lock() {
            return Err(DriverError::connection("Routing table unavailable"));
        }
        Ok(snapshot)
    }
}
