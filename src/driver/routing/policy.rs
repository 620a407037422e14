//! 라우팅 정책
//!
//! 테이블 작업의 라우팅 키와 일관성 결정

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::table::{RoutingOverride, RoutingTableCache, DEFAULT_OVERRIDE_KEY};
use super::super::driver::DriverConfig;
use super::super::error::DriverResult;
use super::super::pool::RoutingKey;
use super::super::types::{ConsistencyLevel, OperationKind};

// ============================================================================
// ResolutionStrategy - 결정 단계
// ============================================================================

/// 오버라이드 대체 체인의 한 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionStrategy {
    /// 테이블 자체 오버라이드
    TableOverride,
    /// `"default"` 오버라이드
    GlobalOverride,
    /// `"default"` 키의 설정 기본 일관성
    SystemDefault,
}

impl ResolutionStrategy {
    /// 평가 순서 (처음 결과를 낸 단계 사용)
    pub const CHAIN: [ResolutionStrategy; 3] = [
        Self::TableOverride,
        Self::GlobalOverride,
        Self::SystemDefault,
    ];

    /// 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TableOverride => "table override",
            Self::GlobalOverride => "global override",
            Self::SystemDefault => "system default",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Route - 라우팅 결과
// ============================================================================

/// 작업 실행 위치와 일관성
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// 대상 핸들 키
    pub routing_key: RoutingKey,
    /// 요청 일관성
    pub consistency: ConsistencyLevel,
    /// 결정한 단계
    pub strategy: ResolutionStrategy,
}

impl Route {
    /// `"default"` key at `consistency`
    pub fn system_default(consistency: ConsistencyLevel) -> Self {
        Self {
            routing_key: RoutingKey::default_key(),
            consistency,
            strategy: ResolutionStrategy::SystemDefault,
        }
    }

    /// Route taken from an override record
    ///
    /// 데이터센터가 비어 있으면 `"default"` 키로 보냅니다.
    /// 해석할 수 없는 일관성은 바인딩 에러입니다.
    pub fn from_override(
        record: &RoutingOverride,
        kind: OperationKind,
        strategy: ResolutionStrategy,
    ) -> DriverResult<Self> {
        let raw = match kind {
            OperationKind::Read => &record.read_consistency,
            OperationKind::Write => &record.write_consistency,
        };
        let consistency: ConsistencyLevel = raw.parse()?;

        let datacenter = record.datacenter.trim();
        let routing_key = if datacenter.is_empty() {
            RoutingKey::default_key()
        } else {
            RoutingKey::new(datacenter)
        };

        Ok(Self {
            routing_key,
            consistency,
            strategy,
        })
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} ({})",
            self.routing_key, self.consistency, self.strategy
        )
    }
}

// ============================================================================
// RoutingResolver - 라우팅 결정기
// ============================================================================

/// `(테이블, 작업)`을 [`Route`]로 결정
///
/// 직접 연결하지 않고 오버라이드는 캐시로 조회합니다.
pub struct RoutingResolver {
    cache: Arc<RoutingTableCache>,
    overrides_enabled: bool,
    routing_table_name: String,
    default_consistency: ConsistencyLevel,
}

impl RoutingResolver {
    /// `config`의 오버라이드 설정으로 생성
    pub fn new(cache: Arc<RoutingTableCache>, config: &DriverConfig) -> Self {
        Self {
            cache,
            overrides_enabled: config.routing_overrides_enabled,
            routing_table_name: config.routing_table_name.clone(),
            default_consistency: config.default_consistency,
        }
    }

    /// `table`의 `operation` 라우팅 결정
    pub async fn resolve(&self, table: &str, operation: OperationKind) -> DriverResult<Route> {
        if !self.overrides_enabled || table == self.routing_table_name {
            return Ok(Route::system_default(self.default_consistency));
        }

        for strategy in ResolutionStrategy::CHAIN {
            if let Some(route) = self.apply(strategy, table, operation).await? {
                debug!("Resolved {} on {} to {}", operation, table, route);
                return Ok(route);
            }
        }

        Ok(Route::system_default(self.default_consistency))
    }

    /// Like [`RoutingResolver::resolve`] with the operation given by name
    pub async fn resolve_named(&self, table: &str, operation: &str) -> DriverResult<Route> {
        let operation: OperationKind = operation.parse()?;
        self.resolve(table, operation).await
    }

    /// 오버라이드 캐시
    pub fn cache(&self) -> &Arc<RoutingTableCache> {
        &self.cache
    }

    async fn apply(
        &self,
        strategy: ResolutionStrategy,
        table: &str,
        operation: OperationKind,
    ) -> DriverResult<Option<Route>> {
        let record = match strategy {
            ResolutionStrategy::TableOverride => self.cache.lookup(table).await,
            ResolutionStrategy::GlobalOverride => self.cache.lookup(DEFAULT_OVERRIDE_KEY).await,
            ResolutionStrategy::SystemDefault => {
                return Ok(Some(Route::system_default(self.default_consistency)));
            }
        };

        record
            .map(|record| Route::from_override(&record, operation, strategy))
            .transpose()
    }
}

impl fmt::Debug for RoutingResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingResolver")
            .field("overrides_enabled", &self.overrides_enabled)
            .field("routing_table_name", &self.routing_table_name)
            .field("default_consistency", &self.default_consistency)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::error::DriverError;
    use crate::driver::testkit::{test_config_builder, MemoryRoutingStore};

    fn resolver(store: Arc<MemoryRoutingStore>, overrides_enabled: bool) -> RoutingResolver {
        let mut builder = test_config_builder().with_default_consistency(ConsistencyLevel::Quorum);
        builder = if overrides_enabled {
            builder.with_routing_overrides()
        } else {
            builder.without_routing_overrides()
        };
        let cache = Arc::new(RoutingTableCache::new(store, None));
        RoutingResolver::new(cache, &builder.build())
    }

    #[tokio::test]
    async fn test_table_override_read_and_write() {
        let store = Arc::new(
            MemoryRoutingStore::new()
                .with_record(RoutingOverride::new("orders", "east", "ONE", "EACH_QUORUM")),
        );
        let resolver = resolver(store, true);

        let read = resolver.resolve("orders", OperationKind::Read).await.unwrap();
        assert_eq!(read.routing_key, RoutingKey::new("east"));
        assert_eq!(read.consistency, ConsistencyLevel::One);
        assert_eq!(read.strategy, ResolutionStrategy::TableOverride);

        let write = resolver.resolve("orders", OperationKind::Write).await.unwrap();
        assert_eq!(write.routing_key, RoutingKey::new("east"));
        assert_eq!(write.consistency, ConsistencyLevel::EachQuorum);
    }

    #[tokio::test]
    async fn test_falls_back_to_global_override() {
        let store = Arc::new(
            MemoryRoutingStore::new()
                .with_record(RoutingOverride::new("default", "central", "LOCAL_ONE", "ALL")),
        );
        let resolver = resolver(store.clone(), true);

        let route = resolver.resolve("payments", OperationKind::Write).await.unwrap();
        assert_eq!(route.routing_key, RoutingKey::new("central"));
        assert_eq!(route.consistency, ConsistencyLevel::All);
        assert_eq!(route.strategy, ResolutionStrategy::GlobalOverride);
        assert_eq!(store.fetch_count("payments"), 1);
        assert_eq!(store.fetch_count("default"), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_system_default() {
        let resolver = resolver(Arc::new(MemoryRoutingStore::new()), true);

        let route = resolver.resolve("payments", OperationKind::Read).await.unwrap();
        assert_eq!(route, Route::system_default(ConsistencyLevel::Quorum));
    }

    #[tokio::test]
    async fn test_overrides_disabled_ignores_records() {
        let store = Arc::new(
            MemoryRoutingStore::new()
                .with_record(RoutingOverride::new("orders", "east", "ONE", "ONE")),
        );
        let resolver = resolver(store.clone(), false);

        let route = resolver.resolve("orders", OperationKind::Write).await.unwrap();
        assert_eq!(route.routing_key, RoutingKey::default_key());
        assert_eq!(route.consistency, ConsistencyLevel::Quorum);
        assert_eq!(store.total_fetches(), 0);
    }

    #[tokio::test]
    async fn test_admin_table_is_not_looked_up() {
        let store = Arc::new(
            MemoryRoutingStore::new()
                .with_record(RoutingOverride::new("driver_config", "east", "ONE", "ONE")),
        );
        let resolver = resolver(store.clone(), true);

        let route = resolver
            .resolve("driver_config", OperationKind::Read)
            .await
            .unwrap();
        assert_eq!(route.routing_key, RoutingKey::default_key());
        assert_eq!(store.total_fetches(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_falls_through_to_default() {
        let store = Arc::new(
            MemoryRoutingStore::new()
                .with_record(RoutingOverride::new("orders", "east", "ONE", "ONE")),
        );
        store.set_failing(true);
        let resolver = resolver(store, true);

        let route = resolver.resolve("orders", OperationKind::Read).await.unwrap();
        assert_eq!(route, Route::system_default(ConsistencyLevel::Quorum));
    }

    #[tokio::test]
    async fn test_unparseable_consistency_is_binding_error() {
        let store = Arc::new(
            MemoryRoutingStore::new()
                .with_record(RoutingOverride::new("orders", "east", "MOSTLY", "ONE")),
        );
        let resolver = resolver(store, true);

        let err = resolver.resolve("orders", OperationKind::Read).await.unwrap_err();
        assert!(matches!(err, DriverError::Binding(_)));

        let write = resolver.resolve("orders", OperationKind::Write).await.unwrap();
        assert_eq!(write.consistency, ConsistencyLevel::One);
    }

    #[tokio::test]
    async fn test_empty_datacenter_routes_to_default_key() {
        let store = Arc::new(
            MemoryRoutingStore::new()
                .with_record(RoutingOverride::new("orders", "  ", "one", "one")),
        );
        let resolver = resolver(store, true);

        let route = resolver.resolve("orders", OperationKind::Read).await.unwrap();
        assert_eq!(route.routing_key, RoutingKey::default_key());
        assert_eq!(route.consistency, ConsistencyLevel::One);
    }

    #[tokio::test]
    async fn test_unknown_operation_kind_is_invalid_argument() {
        let resolver = resolver(Arc::new(MemoryRoutingStore::new()), true);

        let err = resolver.resolve_named("orders", "upsert").await.unwrap_err();
        assert!(matches!(err, DriverError::InvalidArgument(_)));

        let route = resolver.resolve_named("orders", "READ").await.unwrap();
        assert_eq!(route.strategy, ResolutionStrategy::SystemDefault);
    }

    #[tokio::test]
    async fn test_resolved_consistency_is_always_a_known_level() {
        let mut store = MemoryRoutingStore::new();
        for (i, level) in ConsistencyLevel::ALL_LEVELS.iter().enumerate() {
            let table = format!("t{}", i);
            store = store.with_record(RoutingOverride::new(
                table,
                "east",
                level.as_str(),
                level.as_str().to_lowercase(),
            ));
        }
        let resolver = resolver(Arc::new(store), true);

        for (i, level) in ConsistencyLevel::ALL_LEVELS.iter().enumerate() {
            let table = format!("t{}", i);
            for kind in [OperationKind::Read, OperationKind::Write] {
                let route = resolver.resolve(&table, kind).await.unwrap();
                assert_eq!(route.consistency, *level);
                assert!(ConsistencyLevel::ALL_LEVELS.contains(&route.consistency));
            }
        }
    }

    #[test]
    fn test_strategy_chain_order() {
        assert_eq!(
            ResolutionStrategy::CHAIN,
            [
                ResolutionStrategy::TableOverride,
                ResolutionStrategy::GlobalOverride,
                ResolutionStrategy::SystemDefault,
            ]
        );
        assert_eq!(ResolutionStrategy::GlobalOverride.to_string(), "global override");
    }
}
