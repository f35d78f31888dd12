//! Prepared Statement Routing
//!
//! A statement prepared on every node, routed with the same rules as the
//! router itself: reads go round-robin to replicas, writes go to the primary
//! only. Unlike [`Router::exec`](super::Router::exec), a prepared write is
//! never broadcast.

use std::sync::Arc;

use super::scatter::scatter;
use super::select::ReadRouter;
use crate::driver::{ExecResult, Row, Rows, Statement, Value};
use crate::error::Result;

/// One prepared handle per node, aligned with the router's node order
pub struct BoundStatements {
    /// Handle `i` was prepared against node `i`
    stmts: Vec<Arc<dyn Statement>>,
    /// Selection counter borrowed from the parent router
    selector: Arc<ReadRouter>,
}

impl BoundStatements {
    pub(crate) fn new(stmts: Vec<Arc<dyn Statement>>, selector: Arc<ReadRouter>) -> Self {
        Self { stmts, selector }
    }

    /// Number of bound handles (equal to the router's node count)
    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    /// Close every handle concurrently
    pub async fn close(&self) -> Result<()> {
        let stmts = self.stmts.clone();
        scatter(stmts.len(), move |i| {
            let stmt = Arc::clone(&stmts[i]);
            async move { stmt.close().await }
        })
        .await
    }

    /// Primary-only write: executes on the primary's handle alone
    pub async fn exec_primary(&self, args: &[Value]) -> Result<ExecResult> {
        self.stmts[0].execute(args).await
    }

    /// Same as [`exec_primary`](Self::exec_primary)
    pub async fn exec(&self, args: &[Value]) -> Result<ExecResult> {
        self.exec_primary(args).await
    }

    /// Read through the handle on the next replica
    pub async fn query(&self, args: &[Value]) -> Result<Rows> {
        let index = self.selector.slave(self.stmts.len());
        tracing::debug!("Routing prepared read to node {}", index);
        self.stmts[index].query(args).await
    }

    /// Single-row read through the handle on the next replica
    pub async fn query_row(&self, args: &[Value]) -> Result<Row> {
        let index = self.selector.slave(self.stmts.len());
        tracing::debug!("Routing prepared read to node {}", index);
        self.stmts[index].query_row(args).await
    }
}
