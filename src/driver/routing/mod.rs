//! 라우팅 모듈
//!
//! 테이블별 읽기/쓰기를 처리할 데이터센터와 일관성을 결정합니다.
//!
//! # 개요
//!
//! 오버라이드는 관리 테이블(기본 `driver_config`)에 테이블당 한 행과 `"default"` 행으로
//! 저장됩니다. 테이블 행, `"default"` 행 순으로 찾고 둘 다 없으면 `"default"` 라우팅 키에
//! 설정된 기본 일관성을 사용합니다.
//!
//! # 예시
//!
//! ```ignore
//! use cqlroute_driver::driver::routing::{RoutingResolver, RoutingTableCache};
//! use cqlroute_driver::OperationKind;
//!
//! // 오버라이드 캐시 (TTL 없음)
//! let cache = Arc::new(RoutingTableCache::new(store, None));
//! let resolver = RoutingResolver::new(cache, &config);
//!
//! let route = resolver.resolve("orders", OperationKind::Read).await?;
//! println!("orders reads go to {}", route.routing_key);
//! ```

mod policy;
mod table;

pub use policy::{ResolutionStrategy, Route, RoutingResolver};
pub use table::{
    CacheMetrics, RegistryRoutingStore, RoutingOverride, RoutingTableCache, RoutingTableStore,
    DEFAULT_OVERRIDE_KEY, DEFAULT_ROUTING_TABLE,
};
