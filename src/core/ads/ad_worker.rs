use async_trait::async_trait;
use serde_json::{json, Value};

use super::meta_ads::{AdService, MetaAdsApi};
use super::video::VideoService;
use crate::core::jobs::{JobHandler, JobKind};

/// Runs queued video and Meta ad jobs.
pub struct AdWorker<M: MetaAdsApi> {
    videos: VideoService,
    ads: AdService<M>,
}

impl<M: MetaAdsApi> AdWorker<M> {
    pub fn new(videos: VideoService, ads: AdService<M>) -> Self {
        Self { videos, ads }
    }
}

#[async_trait]
impl<M: MetaAdsApi> JobHandler for AdWorker<M> {
    async fn run(&self, job: JobKind) -> Result<Value, String> {
        match job {
            JobKind::GenerateVideo(request) => self
                .videos
                .generate(&request)
                .await
                .map(|url| json!(url))
                .map_err(|e| e.to_string()),
            JobKind::CreateMetaAd {
                access_token,
                request,
            } => self
                .ads
                .create_ad(&access_token, &request)
                .await
                .map(|r| json!(r))
                .map_err(|e| e.to_string()),
            JobKind::PublishMetaAd {
                access_token,
                config,
            } => self
                .ads
                .publish_ad(&access_token, &config)
                .await
                .map(|r| json!(r))
                .map_err(|e| e.to_string()),
        }
    }
}
