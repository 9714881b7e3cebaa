//! In-memory job table plus the bounded hand-off channel workers pull from.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use vclip_models::{validate_project, Job, JobId, JobStatus, VideoProject};

use crate::error::{QueueError, QueueResult};

/// Registry of all known jobs, backed by a bounded `mpsc` channel used as a
/// non-blocking hand-off queue between submission and the worker pool.
pub struct JobRegistry {
    jobs: Arc<Mutex<HashMap<JobId, Job>>>,
    sender: mpsc::Sender<JobId>,
    receiver: Arc<Mutex<mpsc::Receiver<JobId>>>,
    cancel_tx: Arc<Mutex<HashMap<JobId, watch::Sender<bool>>>>,
}

impl JobRegistry {
    pub fn new(queue_size: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_size);
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            cancel_tx: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Validate the project shape, create a pending job, and hand its id to a
    /// worker. Returns [`QueueError::InvalidInput`] without storing anything if
    /// the project fails structural validation (I1-I5), and
    /// [`QueueError::QueueFull`] synchronously (via `try_send`) rather than
    /// blocking the caller when every worker is busy.
    ///
    /// The job is stored *before* its id is handed to a worker: a worker parked
    /// in `dequeue` can pull the id the instant `try_send` succeeds, and must
    /// always find the job already present when it calls `get`.
    pub async fn submit(&self, config: VideoProject) -> QueueResult<JobId> {
        validate_project(&config)?;
        let job = Job::new(config);
        let id = job.id.clone();
        let (cancel_tx, _cancel_rx) = watch::channel(false);

        self.jobs.lock().await.insert(id.clone(), job);
        self.cancel_tx.lock().await.insert(id.clone(), cancel_tx);

        if let Err(err) = self.sender.try_send(id.clone()) {
            self.jobs.lock().await.remove(&id);
            self.cancel_tx.lock().await.remove(&id);
            return Err(match err {
                mpsc::error::TrySendError::Full(_) => QueueError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => {
                    QueueError::internal("hand-off channel closed")
                }
            });
        }

        Ok(id)
    }

    /// Pull the next job id off the hand-off channel. Called in a loop by each
    /// worker in the pool; `None` once the sender side is dropped.
    pub async fn dequeue(&self) -> Option<JobId> {
        self.receiver.lock().await.recv().await
    }

    pub async fn get(&self, id: &JobId) -> QueueResult<Job> {
        self.jobs
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| QueueError::NotFound(id.to_string()))
    }

    pub async fn update<F>(&self, id: &JobId, f: F) -> QueueResult<()>
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        f(job);
        Ok(())
    }

    /// Request cancellation of a running job. No-ops if the job has already
    /// reached a terminal state.
    pub async fn cancel(&self, id: &JobId) -> QueueResult<()> {
        {
            let jobs = self.jobs.lock().await;
            let job = jobs
                .get(id)
                .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
            if job.status.is_terminal() {
                return Err(QueueError::invalid_state(format!(
                    "job is already {}",
                    job.status.as_str()
                )));
            }
        }

        if let Some(tx) = self.cancel_tx.lock().await.get(id) {
            let _ = tx.send(true);
        }
        self.update(id, |job| job.cancel()).await
    }

    /// A per-job cancellation signal the orchestrator hands to the FFmpeg runner.
    pub async fn cancel_receiver(&self, id: &JobId) -> Option<watch::Receiver<bool>> {
        self.cancel_tx.lock().await.get(id).map(|tx| tx.subscribe())
    }

    /// No-ops once the job is already terminal, same as `Job`'s own
    /// lifecycle methods, so a late status write can't regress a job that
    /// was already completed, failed, or cancelled.
    pub async fn mark_status(&self, id: &JobId, status: JobStatus) -> QueueResult<()> {
        self.update(id, |job| {
            if job.status.is_terminal() {
                return;
            }
            job.status = status;
            job.updated_at = chrono::Utc::now();
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vclip_models::{Element, Scene, VideoProject};

    fn sample_project() -> VideoProject {
        VideoProject {
            width: None,
            height: None,
            quality: None,
            elements: Vec::new(),
            scenes: vec![Scene {
                elements: vec![Element::Audio {
                    src: "https://example.com/a.mp3".to_string(),
                }],
            }],
        }
    }

    #[tokio::test]
    async fn submit_then_dequeue_round_trips() {
        let registry = JobRegistry::new(4);
        let id = registry.submit(sample_project()).await.unwrap();

        let dequeued = registry.dequeue().await.unwrap();
        assert_eq!(dequeued, id);

        let stored = registry.get(&id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn job_is_stored_before_its_id_reaches_a_waiting_dequeue() {
        // A worker parked in `dequeue` must never observe an id that `get`
        // then fails to find: the job row has to land before the hand-off.
        let registry = Arc::new(JobRegistry::new(4));
        let dequeue_registry = Arc::clone(&registry);
        let waiter = tokio::spawn(async move { dequeue_registry.dequeue().await });

        let id = registry.submit(sample_project()).await.unwrap();
        let dequeued = waiter.await.unwrap().unwrap();
        assert_eq!(dequeued, id);

        assert!(registry.get(&id).await.is_ok());
    }

    #[tokio::test]
    async fn submit_beyond_capacity_returns_queue_full() {
        let registry = JobRegistry::new(1);
        registry.submit(sample_project()).await.unwrap();
        let err = registry.submit(sample_project()).await.unwrap_err();
        assert!(matches!(err, QueueError::QueueFull));
    }

    #[tokio::test]
    async fn submit_rejects_structurally_invalid_project_without_storing_it() {
        let registry = JobRegistry::new(4);
        let invalid = VideoProject {
            width: None,
            height: None,
            quality: None,
            elements: Vec::new(),
            scenes: vec![Scene::default()],
        };
        let err = registry.submit(invalid).await.unwrap_err();
        assert!(matches!(err, QueueError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn lookup_of_unknown_job_is_not_found() {
        let registry = JobRegistry::new(4);
        let err = registry.get(&JobId::new()).await.unwrap_err();
        assert!(matches!(err, QueueError::NotFound(_)));
    }

    #[tokio::test]
    async fn cancel_is_rejected_once_job_is_terminal() {
        let registry = JobRegistry::new(4);
        let id = registry.submit(sample_project()).await.unwrap();
        registry.mark_status(&id, JobStatus::Completed).await.unwrap();

        let err = registry.cancel(&id).await.unwrap_err();
        assert!(matches!(err, QueueError::InvalidState(_)));
    }
}
