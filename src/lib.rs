//! # cqlroute driver
//!
//! A datacenter-aware access layer for multi-datacenter CQL clusters
//! (Cassandra, DSE, ScyllaDB).
//!
//! ## Features
//!
//! - **Per-table routing** - Each table's reads and writes go to the datacenter and
//!   consistency named in an administrative override table, with a `"default"` row
//!   and a configured default behind it
//! - **Lazy handles** - One transport handle per datacenter, created on first use and
//!   shared by every caller
//! - **Key filters** - Partition scans and point lookups built from partially
//!   populated entities
//! - **Async/Await** - Built on Tokio; asynchronous writes keep running when their
//!   handle is dropped
//!
//! The wire protocol is not part of this crate. Connections are opened by a
//! [`TransportProvider`] supplied by the application.
//!
//! ## Basic Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cqlroute_driver::{Driver, DriverConfig, OperationKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DriverConfig::builder()
//!         .with_contact_points("cass-1.internal,cass-2.internal")
//!         .with_keyspace("shop")
//!         .with_local_datacenter("dc1")
//!         .build();
//!
//!     let driver = Driver::new(config, Arc::new(MyTransport::new()))?;
//!
//!     let route = driver.route("orders", OperationKind::Read).await?;
//!     println!("orders reads: {}", route);
//!
//!     let order = driver.get_by_id(&Order::key("c1", 42)).await?;
//!
//!     driver.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Entities
//!
//! An entity declares its table and key columns statically:
//!
//! ```rust
//! use cqlroute_driver::{EntityDescriptor, KeyColumn};
//!
//! const READINGS: EntityDescriptor = EntityDescriptor::new(
//!     "readings",
//!     &[KeyColumn::named("sensor_id")],
//!     &[KeyColumn::new("taken_at", "ts")],
//! );
//!
//! assert!(READINGS.is_key_column("ts"));
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use cqlroute_driver::{ConsistencyLevel, DriverConfig};
//! use std::time::Duration;
//!
//! let config = DriverConfig::builder()
//!     .with_keyspace("shop")
//!     .with_local_datacenter("dc1")
//!     .with_default_consistency(ConsistencyLevel::LocalOne)
//!     .with_connect_timeout(Duration::from_secs(5))
//!     .without_search()
//!     .build();
//!
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use cqlroute_driver::{DriverConfig, DriverError};
//!
//! let config = DriverConfig::builder().with_keyspace("shop").build();
//!
//! match config.validate() {
//!     Ok(()) => println!("valid"),
//!     Err(DriverError::Configuration(msg)) => eprintln!("Bad config: {}", msg),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```
//!
//! ## Modules
//!
//! - [`driver`] - Configuration, registry, routing and the CRUD facade
//!

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod driver;

// Re-exports for convenience
pub use driver::{
    ClusterTopology, ConsistencyLevel, Driver, DriverConfig, DriverConfigBuilder, DriverError,
    DriverMetrics, DriverResult, Entity, EntityDescriptor, KeyColumn, KeyFilter,
    OperationKind, PendingWrite, RoutingKey, Row, TransportHandle, TransportProvider, Value,
};

/// Config alias for convenience
pub type Config = DriverConfig;
