//! Mock Driver
//!
//! In-process driver that records every call it receives. Failures and canned
//! result sets are configured per descriptor.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Connection, Driver, ExecResult, Rows, Statement, Value};
use crate::error::{Error, Result};

/// A call observed by the mock driver
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open,
    Query(String),
    Execute(String),
    Ping,
    Close,
    Prepare(String),
    StmtExecute(String),
    StmtQuery(String),
    StmtClose(String),
}

/// Shared, ordered record of `(descriptor, call)` pairs
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<(String, Call)>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    async fn record(&self, descriptor: &str, call: Call) {
        self.events.lock().await.push((descriptor.to_string(), call));
    }

    /// All events in the order they were recorded
    pub async fn events(&self) -> Vec<(String, Call)> {
        self.events.lock().await.clone()
    }

    /// Calls received by one descriptor
    pub async fn calls_for(&self, descriptor: &str) -> Vec<Call> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|(d, _)| d == descriptor)
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Descriptors that received a matching call, in call order
    pub async fn targets<F>(&self, predicate: F) -> Vec<String>
    where
        F: Fn(&Call) -> bool,
    {
        self.events
            .lock()
            .await
            .iter()
            .filter(|(_, c)| predicate(c))
            .map(|(d, _)| d.clone())
            .collect()
    }

    /// Number of matching calls received by one descriptor
    pub async fn count<F>(&self, descriptor: &str, predicate: F) -> usize
    where
        F: Fn(&Call) -> bool,
    {
        self.events
            .lock()
            .await
            .iter()
            .filter(|(d, c)| d == descriptor && predicate(c))
            .count()
    }

    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }
}

/// Per-descriptor behaviour
#[derive(Debug, Clone, Default)]
struct NodeBehavior {
    fail_open: bool,
    fail_ping: bool,
    fail_query: bool,
    fail_execute: bool,
    fail_close: bool,
    fail_prepare: bool,
    rows: Option<Rows>,
}

/// Driver that hands out recording connections
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    behaviors: HashMap<String, NodeBehavior>,
    default_rows: Rows,
    latency: Option<Duration>,
    journal: Journal,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn behavior_mut(&mut self, descriptor: &str) -> &mut NodeBehavior {
        self.behaviors.entry(descriptor.to_string()).or_default()
    }

    pub fn fail_open(mut self, descriptor: &str) -> Self {
        self.behavior_mut(descriptor).fail_open = true;
        self
    }

    pub fn fail_ping(mut self, descriptor: &str) -> Self {
        self.behavior_mut(descriptor).fail_ping = true;
        self
    }

    pub fn fail_query(mut self, descriptor: &str) -> Self {
        self.behavior_mut(descriptor).fail_query = true;
        self
    }

    pub fn fail_execute(mut self, descriptor: &str) -> Self {
        self.behavior_mut(descriptor).fail_execute = true;
        self
    }

    pub fn fail_close(mut self, descriptor: &str) -> Self {
        self.behavior_mut(descriptor).fail_close = true;
        self
    }

    pub fn fail_prepare(mut self, descriptor: &str) -> Self {
        self.behavior_mut(descriptor).fail_prepare = true;
        self
    }

    /// Rows returned by every read against one descriptor
    pub fn with_rows(mut self, descriptor: &str, rows: Rows) -> Self {
        self.behavior_mut(descriptor).rows = Some(rows);
        self
    }

    /// Rows returned by reads against descriptors without their own rows
    pub fn with_default_rows(mut self, rows: Rows) -> Self {
        self.default_rows = rows;
        self
    }

    /// Delay applied to every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open(&self, descriptor: &str) -> Result<Arc<dyn Connection>> {
        let behavior = self.behaviors.get(descriptor).cloned().unwrap_or_default();
        let node = Arc::new(MockNode {
            descriptor: descriptor.to_string(),
            rows: behavior.rows.clone().unwrap_or_else(|| self.default_rows.clone()),
            behavior,
            latency: self.latency,
            journal: self.journal.clone(),
        });

        node.enter(Call::Open).await;
        if node.behavior.fail_open {
            return Err(Error::ConnectionFailed {
                descriptor: descriptor.to_string(),
                reason: "mock open failure".into(),
            });
        }

        Ok(Arc::new(MockConnection {
            node,
            closed: AtomicBool::new(false),
        }))
    }
}

/// State shared by a mock connection and the statements prepared on it
#[derive(Debug)]
struct MockNode {
    descriptor: String,
    behavior: NodeBehavior,
    rows: Rows,
    latency: Option<Duration>,
    journal: Journal,
}

impl MockNode {
    async fn enter(&self, call: Call) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.journal.record(&self.descriptor, call).await;
    }

    fn read(&self) -> Result<Rows> {
        if self.behavior.fail_query {
            return Err(Error::QueryExecution(format!(
                "mock query failure on {}",
                self.descriptor
            )));
        }
        Ok(self.rows.clone())
    }

    fn write(&self) -> Result<ExecResult> {
        if self.behavior.fail_execute {
            return Err(Error::QueryExecution(format!(
                "mock execute failure on {}",
                self.descriptor
            )));
        }
        Ok(ExecResult {
            rows_affected: 1,
            last_insert_id: None,
        })
    }
}

/// Recording connection
#[derive(Debug)]
pub struct MockConnection {
    node: Arc<MockNode>,
    closed: AtomicBool,
}

impl MockConnection {
    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn descriptor(&self) -> &str {
        &self.node.descriptor
    }

    async fn query(&self, statement: &str, _args: &[Value]) -> Result<Rows> {
        self.check_open()?;
        self.node.enter(Call::Query(statement.to_string())).await;
        self.node.read()
    }

    async fn execute(&self, statement: &str, _args: &[Value]) -> Result<ExecResult> {
        self.check_open()?;
        self.node.enter(Call::Execute(statement.to_string())).await;
        self.node.write()
    }

    async fn ping(&self) -> Result<()> {
        self.check_open()?;
        self.node.enter(Call::Ping).await;
        if self.node.behavior.fail_ping {
            return Err(Error::ConnectionFailed {
                descriptor: self.node.descriptor.clone(),
                reason: "mock ping failure".into(),
            });
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.node.enter(Call::Close).await;
        if self.node.behavior.fail_close {
            return Err(Error::Internal(format!(
                "mock close failure on {}",
                self.node.descriptor
            )));
        }
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn prepare(&self, statement: &str) -> Result<Box<dyn Statement>> {
        self.check_open()?;
        self.node.enter(Call::Prepare(statement.to_string())).await;
        if self.node.behavior.fail_prepare {
            return Err(Error::QueryExecution(format!(
                "mock prepare failure on {}",
                self.node.descriptor
            )));
        }
        Ok(Box::new(MockStatement {
            node: Arc::clone(&self.node),
            sql: statement.to_string(),
            closed: AtomicBool::new(false),
        }))
    }
}

/// Recording prepared statement
#[derive(Debug)]
pub struct MockStatement {
    node: Arc<MockNode>,
    sql: String,
    closed: AtomicBool,
}

impl MockStatement {
    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::StatementClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl Statement for MockStatement {
    async fn execute(&self, _args: &[Value]) -> Result<ExecResult> {
        self.check_open()?;
        self.node.enter(Call::StmtExecute(self.sql.clone())).await;
        self.node.write()
    }

    async fn query(&self, _args: &[Value]) -> Result<Rows> {
        self.check_open()?;
        self.node.enter(Call::StmtQuery(self.sql.clone())).await;
        self.node.read()
    }

    async fn close(&self) -> Result<()> {
        self.node.enter(Call::StmtClose(self.sql.clone())).await;
        if self.node.behavior.fail_close {
            return Err(Error::Internal(format!(
                "mock statement close failure on {}",
                self.node.descriptor
            )));
        }
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_calls() {
        let driver = MockDriver::new().fail_ping("b");
        let journal = driver.journal();

        let a = driver.open("a").await.unwrap();
        let b = driver.open("b").await.unwrap();

        assert!(a.ping().await.is_ok());
        assert!(b.ping().await.is_err());
        a.execute("INSERT", &[]).await.unwrap();

        assert_eq!(
            journal.calls_for("a").await,
            vec![Call::Open, Call::Ping, Call::Execute("INSERT".into())]
        );
        assert_eq!(journal.count("b", |c| *c == Call::Ping).await, 1);
    }

    #[tokio::test]
    async fn test_mock_closed_connection() {
        let driver = MockDriver::new();
        let conn = driver.open("a").await.unwrap();
        conn.close().await.unwrap();

        assert!(matches!(conn.ping().await, Err(Error::Closed)));
        assert!(matches!(conn.query("SELECT 1", &[]).await, Err(Error::Closed)));
    }

    #[tokio::test]
    async fn test_mock_statement_lifecycle() {
        let rows = Rows::from_values(vec!["n".into()], vec![vec![Value::Int(7)]]);
        let driver = MockDriver::new().with_default_rows(rows);
        let conn = driver.open("a").await.unwrap();

        let stmt = conn.prepare("SELECT n FROM t WHERE id = ?").await.unwrap();
        let row = stmt.query_row(&[Value::Int(1)]).await.unwrap();
        assert_eq!(row.try_i64("n").unwrap(), 7);

        stmt.close().await.unwrap();
        assert!(matches!(stmt.execute(&[]).await, Err(Error::StatementClosed)));
    }
}
