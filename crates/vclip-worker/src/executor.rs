//! Fixed-size worker pool pulling jobs off the registry's hand-off queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};

use vclip_models::JobStatus;
use vclip_queue::JobRegistry;

use crate::config::WorkerConfig;
use crate::logging::JobLogger;
use crate::processor::Orchestrator;

/// A fixed pool of `config.job_workers` tasks, each looping on the registry's
/// shared hand-off channel. A worker re-checks the job's status immediately
/// before starting — a job cancelled while still queued is skipped rather than
/// rendered and discarded.
pub struct WorkerPool {
    config: WorkerConfig,
    registry: Arc<JobRegistry>,
    orchestrator: Arc<Orchestrator>,
    shutdown: watch::Sender<bool>,
}

impl WorkerPool {
    pub fn new(config: WorkerConfig, registry: Arc<JobRegistry>, orchestrator: Orchestrator) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            registry,
            orchestrator: Arc::new(orchestrator),
            shutdown,
        }
    }

    /// Spawn the worker pool and block until every worker exits (after shutdown
    /// is signalled and in-flight jobs have had a chance to finish).
    pub async fn run(&self) {
        info!(workers = self.config.job_workers, "starting worker pool");

        let mut handles = Vec::with_capacity(self.config.job_workers);
        for worker_index in 0..self.config.job_workers {
            let registry = Arc::clone(&self.registry);
            let orchestrator = Arc::clone(&self.orchestrator);
            let shutdown_rx = self.shutdown.subscribe();
            let job_timeout = self.config.job_timeout;

            handles.push(tokio::spawn(worker_loop(
                worker_index,
                registry,
                orchestrator,
                shutdown_rx,
                job_timeout,
            )));
        }

        for handle in handles {
            let _ = handle.await;
        }

        info!("worker pool stopped");
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

async fn worker_loop(
    worker_index: usize,
    registry: Arc<JobRegistry>,
    orchestrator: Arc<Orchestrator>,
    mut shutdown_rx: watch::Receiver<bool>,
    job_timeout: Duration,
) {
    loop {
        let job_id = tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
                continue;
            }
            next = registry.dequeue() => match next {
                Some(id) => id,
                None => break,
            },
        };

        let job = match registry.get(&job_id).await {
            Ok(job) => job,
            Err(e) => {
                warn!(worker = worker_index, %job_id, error = %e, "job vanished before dispatch");
                continue;
            }
        };
        if job.status != JobStatus::Pending {
            continue;
        }

        let logger = JobLogger::new(&job_id, "render");
        logger.log_start("worker picked up job");

        let result = tokio::time::timeout(job_timeout, orchestrator.process(job_id.clone())).await;

        match result {
            Ok(Ok(())) => logger.log_completion("job finished"),
            Ok(Err(e)) => {
                logger.log_error(&e.to_string());
                let _ = registry.update(&job_id, |job| job.fail(e.to_string())).await;
            }
            Err(_) => {
                error!(worker = worker_index, %job_id, "job exceeded its timeout");
                let _ = registry
                    .update(&job_id, |job| job.fail("job exceeded its timeout"))
                    .await;
            }
        }
    }
}
