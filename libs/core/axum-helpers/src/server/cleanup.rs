//! Resource release on shutdown.

use tracing::{error, info};

/// Closes a SeaORM pool, logging the outcome
pub async fn close_postgres(db: sea_orm::DatabaseConnection, name: &str) {
    match db.close().await {
        Ok(()) => info!("PostgreSQL connection '{}' closed successfully", name),
        Err(e) => error!("Error closing PostgreSQL connection '{}': {}", name, e),
    }
}

/// Runs named cleanup tasks concurrently; a panicking task is logged and
/// does not stop the others.
///
/// ```ignore
/// let mut cleanup = CleanupCoordinator::new();
/// cleanup.add_task("postgres", close_postgres(db, "console"));
/// cleanup.run().await;
/// ```
pub struct CleanupCoordinator {
    tasks: Vec<(&'static str, tokio::task::JoinHandle<()>)>,
}

impl CleanupCoordinator {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn add_task<F>(&mut self, name: &'static str, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.tasks.push((name, tokio::spawn(task)));
    }

    pub async fn run(self) {
        info!("Running {} cleanup tasks", self.tasks.len());

        for (name, handle) in self.tasks {
            match handle.await {
                Ok(()) => info!("Cleanup task '{}' completed", name),
                Err(e) => error!("Cleanup task '{}' failed: {}", name, e),
            }
        }
    }
}

impl Default for CleanupCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_all_tasks_run_even_if_one_panics() {
        let done = Arc::new(AtomicU32::new(0));
        let mut cleanup = CleanupCoordinator::new();

        let counter = done.clone();
        cleanup.add_task("ok", async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        cleanup.add_task("boom", async { panic!("cleanup failed") });
        let counter = done.clone();
        cleanup.add_task("ok2", async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        cleanup.run().await;
        assert_eq!(done.load(Ordering::SeqCst), 2);
    }
}
