//! Scatter-Gather Executor
//!
//! Runs one operation per node index on its own task and waits for all of them.
//! The aggregated error is the last failure drained from the completion
//! channel, so with several failing nodes which one is reported depends on
//! completion order.

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Per-index results of one broadcast
pub struct Gathered<T> {
    /// Successful values, positionally aligned with the node indices
    pub values: Vec<Option<T>>,
    /// Last error drained, if any target failed
    pub error: Option<Error>,
}

impl<T> Gathered<T> {
    /// Values of a fully successful broadcast, or the aggregated error
    /// together with the values that did succeed
    pub fn into_parts(self) -> std::result::Result<Vec<T>, (Error, Vec<T>)> {
        match self.error {
            Some(err) => Err((err, self.values.into_iter().flatten().collect())),
            None if self.values.iter().any(Option::is_none) => Err((
                Error::Internal("broadcast result missing".into()),
                self.values.into_iter().flatten().collect(),
            )),
            None => Ok(self.values.into_iter().flatten().collect()),
        }
    }

    /// Values of a fully successful broadcast, or the aggregated error
    pub fn into_result(self) -> Result<Vec<T>> {
        self.into_parts().map_err(|(err, _)| err)
    }
}

/// Run `op(0..count)` concurrently and collect every outcome by index
pub async fn gather<T, F, Fut>(count: usize, op: F) -> Gathered<T>
where
    T: Send + 'static,
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let mut values: Vec<Option<T>> = (0..count).map(|_| None).collect();
    if count == 0 {
        return Gathered { values, error: None };
    }

    let (tx, mut rx) = mpsc::channel(count);
    for index in 0..count {
        let tx = tx.clone();
        let task = op(index);
        tokio::spawn(async move {
            let result = task.await;
            let _ = tx.send((index, result)).await;
        });
    }
    drop(tx);

    let mut error = None;
    let mut drained = 0;
    while let Some((index, result)) = rx.recv().await {
        drained += 1;
        match result {
            Ok(value) => values[index] = Some(value),
            Err(e) => {
                tracing::warn!("Broadcast target {} failed: {}", index, e);
                error = Some(e);
            }
        }
    }

    // A worker that panicked never reports back
    if drained < count {
        tracing::error!("{} of {} broadcast workers did not complete", count - drained, count);
        error = Some(Error::Internal(format!(
            "{} broadcast worker(s) aborted",
            count - drained
        )));
    }

    Gathered { values, error }
}

/// Run `op(0..count)` concurrently; `Ok` only if every invocation succeeded
pub async fn scatter<F, Fut>(count: usize, op: F) -> Result<()>
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    match gather(count, op).await.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_scatter_all_succeed() {
        for n in 1..=8 {
            let result = scatter(n, |_| async { Ok(()) }).await;
            assert!(result.is_ok(), "n = {}", n);
        }
    }

    #[tokio::test]
    async fn test_scatter_zero_targets() {
        assert!(scatter(0, |_| async { Err(Error::Closed) }).await.is_ok());
    }

    #[tokio::test]
    async fn test_scatter_fault_visibility() {
        for n in 1..=8 {
            let one = scatter(n, move |i| async move {
                if i == n - 1 { Err(Error::Closed) } else { Ok(()) }
            })
            .await;
            assert!(one.is_err(), "one failure, n = {}", n);

            let all = scatter(n, |_| async { Err(Error::Closed) }).await;
            assert!(all.is_err(), "all failures, n = {}", n);
        }
    }

    #[tokio::test]
    async fn test_scatter_waits_for_every_target() {
        let done = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&done);

        let result = scatter(5, move |i| {
            let counter = Arc::clone(&counter);
            async move {
                tokio::time::sleep(Duration::from_millis(10 * i as u64)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                if i == 0 { Err(Error::Closed) } else { Ok(()) }
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(done.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_scatter_single_opaque_error() {
        // Later completions win: index 2 finishes last
        let result = scatter(3, |i| async move {
            tokio::time::sleep(Duration::from_millis(20 * i as u64)).await;
            Err(Error::NodeNotFound(i))
        })
        .await;

        assert!(matches!(result, Err(Error::NodeNotFound(2))));
    }

    #[tokio::test]
    async fn test_gather_aligns_values() {
        let gathered = gather(4, |i| async move {
            tokio::time::sleep(Duration::from_millis(5 * (4 - i) as u64)).await;
            Ok(i * 10)
        })
        .await;

        assert_eq!(gathered.into_result().unwrap(), vec![0, 10, 20, 30]);
    }

    #[tokio::test]
    async fn test_gather_partial_success() {
        let gathered = gather(3, |i| async move {
            if i == 1 { Err(Error::Closed) } else { Ok(i) }
        })
        .await;

        match gathered.into_parts() {
            Err((Error::Closed, succeeded)) => assert_eq!(succeeded, vec![0, 2]),
            _ => panic!("expected partial failure"),
        }
    }

    #[tokio::test]
    async fn test_gather_panicking_worker() {
        let result = scatter(2, |i| async move {
            if i == 1 {
                panic!("worker blew up");
            }
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(Error::Internal(_))));
    }
}
