//! Driver Module
//!
//! The physical-connection contract the router is built on. A driver opens one
//! connection per descriptor; the router never talks to a database any other way.

pub mod mock;
mod mysql;
mod value;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};

pub use mock::{Call, Journal, MockDriver};
pub use mysql::{MySqlConnection, MySqlDriver, MySqlStatement};
pub use value::{ExecResult, Row, Rows, Value};

/// Opens physical connections from connection descriptors
#[async_trait]
pub trait Driver: Send + Sync {
    /// Driver identifier, e.g. "mysql"
    fn name(&self) -> &str;

    /// Open one physical connection
    async fn open(&self, descriptor: &str) -> Result<Arc<dyn Connection>>;
}

/// A single handle to one database endpoint
#[async_trait]
pub trait Connection: Send + Sync {
    /// Descriptor this connection was opened from
    fn descriptor(&self) -> &str;

    /// Run a statement that returns rows
    async fn query(&self, statement: &str, args: &[Value]) -> Result<Rows>;

    /// Run a statement that is expected to return at most one row
    async fn query_row(&self, statement: &str, args: &[Value]) -> Result<Row> {
        self.query(statement, args)
            .await?
            .into_first()
            .ok_or(Error::NoRows)
    }

    /// Run a statement that returns no rows
    async fn execute(&self, statement: &str, args: &[Value]) -> Result<ExecResult>;

    /// Verify the endpoint is reachable
    async fn ping(&self) -> Result<()>;

    /// Release the connection
    async fn close(&self) -> Result<()>;

    /// Prepare a statement on this connection
    async fn prepare(&self, statement: &str) -> Result<Box<dyn Statement>>;
}

/// A statement prepared against one connection
#[async_trait]
pub trait Statement: Send + Sync {
    async fn execute(&self, args: &[Value]) -> Result<ExecResult>;

    async fn query(&self, args: &[Value]) -> Result<Rows>;

    async fn query_row(&self, args: &[Value]) -> Result<Row> {
        self.query(args).await?.into_first().ok_or(Error::NoRows)
    }

    async fn close(&self) -> Result<()>;
}

/// Look up a built-in driver by identifier
pub fn by_name(name: &str) -> Result<Arc<dyn Driver>> {
    match name.to_ascii_lowercase().as_str() {
        "mysql" | "mariadb" => Ok(Arc::new(MySqlDriver::default())),
        "mock" => Ok(Arc::new(MockDriver::new())),
        _ => Err(Error::UnknownDriver(name.to_string())),
    }
}

/// Mask the password in a descriptor so it can be logged
pub fn redact(descriptor: &str) -> String {
    let start = descriptor.find("://").map(|i| i + 3).unwrap_or(0);
    let Some(at) = descriptor.rfind('@').filter(|&at| at >= start) else {
        return descriptor.to_string();
    };

    match descriptor[start..at].find(':') {
        Some(colon) => format!(
            "{}:***{}",
            &descriptor[..start + colon],
            &descriptor[at..]
        ),
        None => descriptor.to_string(),
    }
}
