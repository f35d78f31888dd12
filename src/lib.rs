//! WolfRouter - Primary/Replica Broadcast Router
//!
//! Presents one logical database handle backed by a primary and any number
//! of read replicas.
//!
//! # Architecture
//!
//! The router owns one physical connection per node. Node 0 is the primary.
//! Writes are duplicated by the client to every node (or to the replicas only,
//! for catch-up), reads are spread round-robin over the replicas. This is
//! statement broadcast, not replication: there is no log, no ordering across
//! nodes and no rollback when a node fails.
//!
//! # Features
//!
//! - Concurrent scatter-gather for open, close, ping, writes and prepare
//! - Round-robin read routing shared by the router and its prepared statements
//! - sqlx-backed MySQL / MariaDB driver and a recording mock driver
//! - REST service for cars built on the router

pub mod api;
pub mod config;
pub mod driver;
pub mod error;
pub mod router;

pub use config::RouterConfig;
pub use error::{Error, Result};
pub use router::{BoundStatements, Router};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::RouterConfig;
    pub use crate::driver::{Connection, Driver, ExecResult, MockDriver, Row, Rows, Value};
    pub use crate::error::{Error, Result};
    pub use crate::router::{BoundStatements, Router, RouterStats};
}
