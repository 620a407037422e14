//! Driver Module
//!
//! 멀티 데이터센터 CQL 클러스터용 라우팅/일관성 계층
//!
//! # Components
//!
//! - 설정 (DriverConfig, DriverConfigBuilder)
//! - 연결 레지스트리: 라우팅 키별 트랜스포트 핸들 (ConnectionRegistry)
//! - 라우팅 오버라이드 (RoutingTableCache, RoutingResolver)
//! - 키 필터: EntityDescriptor 기반 KeyFilter
//! - 파사드: Driver (조회/저장/삭제, 검색, CQL 직접 실행)
//!
//! # Example
//!
//! ```ignore
//! use cqlroute_driver::driver::{Driver, DriverConfig};
//!
//! let config = DriverConfig::builder()
//!     .with_contact_points("10.0.0.1,10.0.0.2")
//!     .with_keyspace("shop")
//!     .with_local_datacenter("dc1")
//!     .with_credentials("app", "secret")
//!     .build();
//!
//! let driver = Driver::new(config, provider)?;
//!
//! // "orders" 오버라이드, 없으면 "default" 오버라이드로 라우팅
//! let order = driver.get_by_id(&Order::key("c1", 42)).await?;
//! driver.save(&order).await?;
//!
//! // 비동기 쓰기 (핸들을 drop해도 취소되지 않음)
//! let pending = driver.save_async(&order).await?;
//! pending.await?;
//!
//! driver.close().await?;
//! ```

pub mod routing;
mod driver;
mod entity;
mod error;
mod filter;
mod pool;
mod record;
mod statement;
mod transport;
mod types;

#[cfg(test)]
mod testkit;

// Re-exports
pub use driver::{
    ClusterTopology, ConnectionLimit, Credentials, Driver, DriverConfig, DriverConfigBuilder,
    DriverMetrics, PendingWrite, TlsOptions, TrustStore, DEFAULT_SEARCH_LIMIT,
};
pub use entity::{Entity, EntityDescriptor, KeyColumn};
pub use error::{DriverError, DriverResult};
pub use filter::{KeyFilter, Predicate};
pub use pool::{ConnectionRegistry, RegistryMetrics, RoutingKey, DEFAULT_ROUTING_KEY};
pub use record::Row;
pub use statement::{Delete, SearchQuery, Select, TableRef, Upsert, SEARCH_QUERY_COLUMN};
pub use transport::{ConnectionTarget, TargetScope, TransportHandle, TransportProvider};
pub use types::{ConsistencyLevel, OperationKind, Value};
