// Background job queue with exactly one worker.
//
// Jobs are accepted immediately and processed in submission order. Status lives
// in a concurrent map so request handlers can poll it without locking the
// worker.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::ads::meta_ads::{CampaignConfig, MetaAdRequest};
use crate::core::ads::video::VideoRequest;

#[derive(Debug, Clone, PartialEq)]
pub enum JobKind {
    GenerateVideo(VideoRequest),
    CreateMetaAd {
        access_token: String,
        request: MetaAdRequest,
    },
    PublishMetaAd {
        access_token: String,
        config: CampaignConfig,
    },
}

impl JobKind {
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::GenerateVideo(_) => "generate_video",
            JobKind::CreateMetaAd { .. } => "create_meta_ad",
            JobKind::PublishMetaAd { .. } => "publish_meta_ad",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending,
    Running,
    Success(Value),
    Failure(String),
}

impl JobStatus {
    pub fn to_json(&self) -> Value {
        match self {
            JobStatus::Pending => json!({ "status": "pending" }),
            JobStatus::Running => json!({ "status": "running" }),
            JobStatus::Success(result) => json!({ "status": "success", "result": result }),
            JobStatus::Failure(detail) => json!({ "status": "failure", "detail": detail }),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Success(_) | JobStatus::Failure(_))
    }
}

#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Runs one job. The error string becomes the failure detail.
    async fn run(&self, job: JobKind) -> Result<Value, String>;
}

#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::UnboundedSender<(Uuid, JobKind)>,
    statuses: Arc<DashMap<Uuid, JobStatus>>,
}

impl JobQueue {
    /// Spawns the worker on the current runtime.
    pub fn start(handler: Arc<dyn JobHandler>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<(Uuid, JobKind)>();
        let statuses: Arc<DashMap<Uuid, JobStatus>> = Arc::new(DashMap::new());

        let worker_statuses = statuses.clone();
        tokio::spawn(async move {
            while let Some((id, job)) = receiver.recv().await {
                let kind = job.name();
                worker_statuses.insert(id, JobStatus::Running);
                tracing::info!(job_id = %id, kind, "Job started");

                let status = match handler.run(job).await {
                    Ok(result) => {
                        tracing::info!(job_id = %id, kind, "Job succeeded");
                        JobStatus::Success(result)
                    }
                    Err(detail) => {
                        tracing::error!(job_id = %id, kind, error = %detail, "Job failed");
                        JobStatus::Failure(detail)
                    }
                };
                worker_statuses.insert(id, status);
            }
            tracing::info!("Job worker stopped");
        });

        Self { sender, statuses }
    }

    pub fn submit(&self, job: JobKind) -> Uuid {
        let id = Uuid::new_v4();
        self.statuses.insert(id, JobStatus::Pending);
        if self.sender.send((id, job)).is_err() {
            self.statuses
                .insert(id, JobStatus::Failure("job worker is not running".to_string()));
        }
        id
    }

    /// Unknown ids read as pending.
    pub fn status(&self, id: &Uuid) -> JobStatus {
        self.statuses
            .get(id)
            .map(|s| s.value().clone())
            .unwrap_or(JobStatus::Pending)
    }
}
