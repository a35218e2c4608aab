//! Concurrent fan-out / fan-in with first-error-wins semantics
//!
//! Every operation runs as its own tokio task. The runner returns once:
//! `Ok(())` after all operations succeed, or the first failure delivered on
//! the result channel. Operations still in flight at that point are
//! detached. They run to completion and their results are dropped; the
//! channel is buffered for every task so a straggler never blocks on send.

use anyhow::{anyhow, Result};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type BoxTask = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send>;

struct NamedTask {
    name: String,
    op: BoxTask,
}

/// A set of independent operations to run concurrently
#[derive(Default)]
pub struct TaskRunner {
    tasks: Vec<NamedTask>,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an operation; nothing runs until [`TaskRunner::run`]
    pub fn push<F, Fut>(&mut self, name: impl Into<String>, op: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.tasks.push(NamedTask {
            name: name.into(),
            op: Box::new(move || Box::pin(op())),
        });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run everything; return the first failure without waiting for the rest
    pub async fn run(self) -> Result<()> {
        self.execute(None).await
    }

    /// Like [`TaskRunner::run`], but after the first failure wait up to
    /// `grace` for the remaining operations before detaching them
    pub async fn run_with_grace(self, grace: Duration) -> Result<()> {
        self.execute(Some(grace)).await
    }

    async fn execute(self, grace: Option<Duration>) -> Result<()> {
        let total = self.tasks.len();
        if total == 0 {
            return Ok(());
        }

        let (tx, mut rx) = mpsc::channel::<(String, Result<()>)>(total);
        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(total);

        for NamedTask { name, op } in self.tasks {
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                // Inner spawn turns a panic into a reportable failure
                let result = match tokio::spawn(op()).await {
                    Ok(result) => result,
                    Err(e) => Err(anyhow!("task `{}` panicked: {}", name, e)),
                };
                let _ = tx.send((name, result)).await;
            }));
        }
        drop(tx);

        let mut completed = 0;
        while let Some((name, result)) = rx.recv().await {
            completed += 1;
            match result {
                Ok(()) => debug!(task = %name, completed, total, "task finished"),
                Err(e) => {
                    warn!(task = %name, error = %e, "task failed");
                    let stragglers = total - completed;
                    if stragglers > 0 {
                        match grace {
                            Some(grace) => wait_for_stragglers(handles, grace).await,
                            None => debug!(stragglers, "detaching remaining tasks"),
                        }
                    }
                    return Err(e);
                }
            }
        }

        if completed < total {
            return Err(anyhow!("{} of {} tasks exited without reporting", total - completed, total));
        }
        Ok(())
    }
}

/// Bounded wait for in-flight tasks; whatever is left is detached
async fn wait_for_stragglers(handles: Vec<JoinHandle<()>>, grace: Duration) {
    let all = async {
        for handle in handles {
            let _ = handle.await;
        }
    };
    if tokio::time::timeout(grace, all).await.is_err() {
        debug!(?grace, "grace period elapsed, detaching remaining tasks");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_empty_runner_succeeds() {
        assert!(TaskRunner::new().run().await.is_ok());
    }

    #[tokio::test]
    async fn test_all_succeed() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut runner = TaskRunner::new();
        for i in 0..3 {
            let counter = Arc::clone(&counter);
            runner.push(format!("op{}", i), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        assert_eq!(runner.len(), 3);

        runner.run().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_middle_failure_is_reported() {
        let mut runner = TaskRunner::new();
        runner.push("first", || async { Ok(()) });
        runner.push("second", || async { Err(anyhow!("boom")) });
        runner.push("third", || async { Ok(()) });

        let err = runner.run().await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_first_failure_wins() {
        let mut runner = TaskRunner::new();
        runner.push("slow", || async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Err(anyhow!("late"))
        });
        runner.push("fast", || async { Err(anyhow!("early")) });

        let err = runner.run().await.unwrap_err();
        assert_eq!(err.to_string(), "early");
    }

    #[tokio::test]
    async fn test_returns_before_stragglers_finish() {
        let finished = Arc::new(AtomicUsize::new(0));
        let mut runner = TaskRunner::new();
        runner.push("fail", || async { Err(anyhow!("boom")) });
        {
            let finished = Arc::clone(&finished);
            runner.push("straggler", move || async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        assert!(runner.run().await.is_err());
        assert_eq!(finished.load(Ordering::SeqCst), 0);

        // The detached straggler still runs to completion
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_grace_waits_for_stragglers() {
        let finished = Arc::new(AtomicUsize::new(0));
        let mut runner = TaskRunner::new();
        runner.push("fail", || async { Err(anyhow!("boom")) });
        {
            let finished = Arc::clone(&finished);
            runner.push("straggler", move || async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Err(anyhow!("ignored"))
            });
        }

        let err = runner.run_with_grace(Duration::from_secs(5)).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panic_is_reported() {
        let mut runner = TaskRunner::new();
        runner.push("explodes", || async {
            let values: Vec<u32> = Vec::new();
            let _ = values[1];
            Ok(())
        });

        let err = runner.run().await.unwrap_err();
        assert!(err.to_string().contains("explodes"));
    }
}
