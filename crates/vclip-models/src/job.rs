//! Job lifecycle for the render pipeline.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{JobId, VideoId};
use crate::project::VideoProject;

/// Job lifecycle state. `Completed`, `Failed`, and `Cancelled` are terminal — once a
/// job reaches one of them it never transitions again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// A render job tracked by the registry from submission through completion.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    pub id: JobId,

    /// Assigned once the job reaches `Completed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<VideoId>,

    pub status: JobStatus,

    /// 0-100. Monotonic while `Processing`; pinned to 100 on `Completed`.
    #[serde(default)]
    pub progress: u8,

    pub config: VideoProject,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    pub fn new(config: VideoProject) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            video_id: None,
            status: JobStatus::Pending,
            progress: 0,
            config,
            created_at: now,
            updated_at: now,
            completed_at: None,
            error: None,
        }
    }

    pub fn start(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Processing;
        self.updated_at = Utc::now();
    }

    pub fn set_progress(&mut self, progress: u8) {
        if self.status.is_terminal() {
            return;
        }
        self.progress = progress.min(100);
        self.updated_at = Utc::now();
    }

    /// No-op once the job is already terminal, so a cancellation that lands
    /// just before a pipeline's own success/failure update can't be
    /// overwritten back to a different terminal state.
    pub fn complete(&mut self, video_id: VideoId) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Completed;
        self.video_id = Some(video_id);
        self.progress = 100;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    pub fn cancel(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Cancelled;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }
}
