use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::storage::Downloader;

pub const GRAPH_API_VERSION: &str = "v18.0";

#[derive(Debug, Error)]
pub enum MetaError {
    #[error("Meta app not configured")]
    NotConfigured,
    #[error("User not authorized")]
    NotAuthorized,
    #[error("Meta API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Meta request failed: {0}")]
    Http(String),
    #[error("Asset download failed: {0}")]
    Download(String),
    #[error("{0}")]
    InvalidInput(String),
}

fn default_cta() -> String {
    "LEARN_MORE".to_string()
}
fn default_budget() -> i64 {
    1000
}
fn default_objective() -> String {
    "LINK_CLICKS".to_string()
}
fn default_asset_type() -> String {
    "video".to_string()
}

/// Input for creating a paused ad from already uploaded assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaAdRequest {
    pub user_id: String,
    pub ad_account_id: String,
    pub page_id: String,
    pub headline: String,
    pub body: String,
    pub link_url: String,
    #[serde(default = "default_cta")]
    pub cta: String,
    #[serde(default)]
    pub image_hash: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub campaign_name: Option<String>,
    #[serde(default)]
    pub adset_id: Option<String>,
    #[serde(default)]
    pub adset_name: Option<String>,
    #[serde(default = "default_budget")]
    pub daily_budget: i64,
    #[serde(default = "default_objective")]
    pub objective: String,
}

/// Input for a scheduled ad whose asset still has to be uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub user_id: String,
    pub ad_account_id: String,
    pub page_id: String,
    pub headline: String,
    pub body: String,
    pub link_url: String,
    #[serde(default = "default_cta")]
    pub cta: String,
    pub asset_url: String,
    #[serde(default = "default_asset_type")]
    pub asset_type: String,
    #[serde(default = "default_budget")]
    pub daily_budget: i64,
    #[serde(default = "default_objective")]
    pub objective: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub campaign_name: Option<String>,
    #[serde(default)]
    pub adset_id: Option<String>,
    #[serde(default)]
    pub adset_name: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Video,
    Image,
}

impl CampaignConfig {
    pub fn asset_kind(&self) -> Result<AssetKind, MetaError> {
        match self.asset_type.as_str() {
            "video" => Ok(AssetKind::Video),
            "image" => Ok(AssetKind::Image),
            other => Err(MetaError::InvalidInput(format!(
                "asset_type must be video or image (got {other})"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdResult {
    pub ad_id: String,
    pub campaign_id: String,
    pub adset_id: String,
}

/// Ad account edges that accept object creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdEdge {
    Campaigns,
    AdSets,
    AdCreatives,
    Ads,
}

impl AdEdge {
    pub fn path(self) -> &'static str {
        match self {
            AdEdge::Campaigns => "campaigns",
            AdEdge::AdSets => "adsets",
            AdEdge::AdCreatives => "adcreatives",
            AdEdge::Ads => "ads",
        }
    }
}

#[async_trait]
pub trait MetaAdsApi: Send + Sync {
    /// Creates an object under `act_{account}` and returns its id.
    async fn create(&self, token: &str, account: &str, edge: AdEdge, params: &Value)
        -> Result<String, MetaError>;
    /// Returns the image hash.
    async fn upload_image(&self, token: &str, account: &str, bytes: Vec<u8>, filename: &str)
        -> Result<String, MetaError>;
    /// Returns the video id.
    async fn upload_video(&self, token: &str, account: &str, bytes: Vec<u8>, filename: &str)
        -> Result<String, MetaError>;
}

#[async_trait]
impl<M: MetaAdsApi + ?Sized> MetaAdsApi for Arc<M> {
    async fn create(&self, token: &str, account: &str, edge: AdEdge, params: &Value) -> Result<String, MetaError> {
        (**self).create(token, account, edge, params).await
    }

    async fn upload_image(&self, token: &str, account: &str, bytes: Vec<u8>, filename: &str) -> Result<String, MetaError> {
        (**self).upload_image(token, account, bytes, filename).await
    }

    async fn upload_video(&self, token: &str, account: &str, bytes: Vec<u8>, filename: &str) -> Result<String, MetaError> {
        (**self).upload_video(token, account, bytes, filename).await
    }
}

/// `act_` prefixed account id, as the Graph API expects it.
pub fn account_path(ad_account_id: &str) -> String {
    if ad_account_id.starts_with("act_") {
        ad_account_id.to_string()
    } else {
        format!("act_{ad_account_id}")
    }
}

pub fn campaign_params(name: Option<&str>, objective: &str) -> Value {
    json!({
        "name": name.unwrap_or("Generated Campaign"),
        "status": "PAUSED",
        "objective": objective,
    })
}

pub fn adset_params(
    name: Option<&str>,
    campaign_id: &str,
    daily_budget: i64,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
) -> Value {
    let mut params = json!({
        "name": name.unwrap_or("Generated Ad Set"),
        "campaign_id": campaign_id,
        "daily_budget": daily_budget.to_string(),
        "billing_event": "IMPRESSIONS",
        "optimization_goal": "LINK_CLICKS",
        "targeting": { "geo_locations": { "countries": ["US"] } },
        "status": "PAUSED",
    });
    if let Some(start) = start_time {
        params["start_time"] = json!(start.timestamp());
    }
    if let Some(end) = end_time {
        params["end_time"] = json!(end.timestamp());
    }
    params
}

pub struct CreativeCopy<'a> {
    pub page_id: &'a str,
    pub headline: &'a str,
    pub body: &'a str,
    pub link_url: &'a str,
    pub cta: &'a str,
}

pub fn object_story_spec(copy: &CreativeCopy<'_>, image_hash: Option<&str>, video_id: Option<&str>) -> Value {
    let mut spec = json!({
        "page_id": copy.page_id,
        "link_data": {
            "message": copy.body,
            "link": copy.link_url,
            "call_to_action": { "type": copy.cta },
            "name": copy.headline,
        },
    });
    if let Some(hash) = image_hash.filter(|h| !h.is_empty()) {
        spec["link_data"]["image_hash"] = json!(hash);
    }
    if let Some(id) = video_id.filter(|v| !v.is_empty()) {
        spec["video_data"] = json!({ "video_id": id });
    }
    spec
}

pub fn creative_params(spec: Value) -> Value {
    json!({ "name": "Generated Creative", "object_story_spec": spec })
}

pub fn ad_params(adset_id: &str, creative_id: &str) -> Value {
    json!({
        "name": "Generated Ad",
        "adset_id": adset_id,
        "creative": { "creative_id": creative_id },
        "status": "PAUSED",
    })
}

pub struct AdService<M: MetaAdsApi> {
    api: M,
    downloader: Arc<dyn Downloader>,
}

struct Placement<'a> {
    account: &'a str,
    campaign_id: Option<&'a str>,
    campaign_name: Option<&'a str>,
    objective: &'a str,
    adset_id: Option<&'a str>,
    adset_name: Option<&'a str>,
    daily_budget: i64,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

impl<M: MetaAdsApi> AdService<M> {
    pub fn new(api: M, downloader: Arc<dyn Downloader>) -> Self {
        Self { api, downloader }
    }

    pub fn api(&self) -> &M {
        &self.api
    }

    pub async fn create_ad(&self, token: &str, request: &MetaAdRequest) -> Result<AdResult, MetaError> {
        let account = account_path(&request.ad_account_id);
        let (campaign_id, adset_id) = self
            .ensure_placement(
                token,
                &Placement {
                    account: &account,
                    campaign_id: request.campaign_id.as_deref(),
                    campaign_name: request.campaign_name.as_deref(),
                    objective: &request.objective,
                    adset_id: request.adset_id.as_deref(),
                    adset_name: request.adset_name.as_deref(),
                    daily_budget: request.daily_budget,
                    start_time: None,
                    end_time: None,
                },
            )
            .await?;

        let spec = object_story_spec(
            &CreativeCopy {
                page_id: &request.page_id,
                headline: &request.headline,
                body: &request.body,
                link_url: &request.link_url,
                cta: &request.cta,
            },
            request.image_hash.as_deref(),
            request.video_id.as_deref(),
        );
        let ad_id = self.create_creative_and_ad(token, &account, spec, &adset_id).await?;
        Ok(AdResult {
            ad_id,
            campaign_id,
            adset_id,
        })
    }

    /// Uploads the asset at `asset_url` and creates a scheduled paused ad.
    pub async fn publish_ad(&self, token: &str, config: &CampaignConfig) -> Result<AdResult, MetaError> {
        let kind = config.asset_kind()?;
        let account = account_path(&config.ad_account_id);
        let (campaign_id, adset_id) = self
            .ensure_placement(
                token,
                &Placement {
                    account: &account,
                    campaign_id: config.campaign_id.as_deref(),
                    campaign_name: config.campaign_name.as_deref(),
                    objective: &config.objective,
                    adset_id: config.adset_id.as_deref(),
                    adset_name: config.adset_name.as_deref(),
                    daily_budget: config.daily_budget,
                    start_time: config.start_time,
                    end_time: config.end_time,
                },
            )
            .await?;

        let copy = CreativeCopy {
            page_id: &config.page_id,
            headline: &config.headline,
            body: &config.body,
            link_url: &config.link_url,
            cta: &config.cta,
        };
        let spec = match kind {
            AssetKind::Video => {
                let video_id = self.upload_video_from(token, &account, &config.asset_url).await?;
                object_story_spec(&copy, None, Some(&video_id))
            }
            AssetKind::Image => {
                let hash = self.upload_image_from(token, &account, &config.asset_url).await?;
                object_story_spec(&copy, Some(&hash), None)
            }
        };

        let ad_id = self.create_creative_and_ad(token, &account, spec, &adset_id).await?;
        Ok(AdResult {
            ad_id,
            campaign_id,
            adset_id,
        })
    }

    pub async fn upload_image_from(&self, token: &str, ad_account_id: &str, url: &str) -> Result<String, MetaError> {
        let bytes = self.fetch(url).await?;
        self.api
            .upload_image(token, &account_path(ad_account_id), bytes, "asset.png")
            .await
    }

    pub async fn upload_video_from(&self, token: &str, ad_account_id: &str, url: &str) -> Result<String, MetaError> {
        let bytes = self.fetch(url).await?;
        self.api
            .upload_video(token, &account_path(ad_account_id), bytes, "asset.mp4")
            .await
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, MetaError> {
        self.downloader
            .download(url)
            .await
            .map_err(|e| MetaError::Download(e.to_string()))
    }

    async fn ensure_placement(&self, token: &str, p: &Placement<'_>) -> Result<(String, String), MetaError> {
        let campaign_id = match p.campaign_id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => {
                let id = self
                    .api
                    .create(token, p.account, AdEdge::Campaigns, &campaign_params(p.campaign_name, p.objective))
                    .await?;
                tracing::info!(campaign_id = %id, "Created paused campaign");
                id
            }
        };

        let adset_id = match p.adset_id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => {
                let params = adset_params(p.adset_name, &campaign_id, p.daily_budget, p.start_time, p.end_time);
                let id = self.api.create(token, p.account, AdEdge::AdSets, &params).await?;
                tracing::info!(adset_id = %id, "Created paused ad set");
                id
            }
        };

        Ok((campaign_id, adset_id))
    }

    async fn create_creative_and_ad(
        &self,
        token: &str,
        account: &str,
        spec: Value,
        adset_id: &str,
    ) -> Result<String, MetaError> {
        let creative_id = self
            .api
            .create(token, account, AdEdge::AdCreatives, &creative_params(spec))
            .await?;
        let ad_id = self
            .api
            .create(token, account, AdEdge::Ads, &ad_params(adset_id, &creative_id))
            .await?;
        tracing::info!(ad_id = %ad_id, creative_id = %creative_id, "Created paused ad");
        Ok(ad_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::object_store::fake_downloads::CannedDownloads;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMeta {
        calls: Mutex<Vec<(String, AdEdge, Value)>>,
        uploads: Mutex<Vec<(String, String, usize)>>,
    }

    #[async_trait]
    impl MetaAdsApi for RecordingMeta {
        async fn create(&self, _token: &str, account: &str, edge: AdEdge, params: &Value) -> Result<String, MetaError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push((account.to_string(), edge, params.clone()));
            Ok(format!("{}-{}", edge.path(), calls.len()))
        }

        async fn upload_image(&self, _token: &str, account: &str, bytes: Vec<u8>, _f: &str) -> Result<String, MetaError> {
            self.uploads
                .lock()
                .unwrap()
                .push(("image".into(), account.into(), bytes.len()));
            Ok("hash-1".to_string())
        }

        async fn upload_video(&self, _token: &str, account: &str, bytes: Vec<u8>, _f: &str) -> Result<String, MetaError> {
            self.uploads
                .lock()
                .unwrap()
                .push(("video".into(), account.into(), bytes.len()));
            Ok("video-1".to_string())
        }
    }

    fn ad_request() -> MetaAdRequest {
        serde_json::from_value(json!({
            "user_id": "u1",
            "ad_account_id": "123",
            "page_id": "p1",
            "headline": "New drop",
            "body": "Grab it",
            "link_url": "https://shop.example",
            "image_hash": "abc"
        }))
        .unwrap()
    }

    fn service(downloads: CannedDownloads) -> AdService<RecordingMeta> {
        AdService::new(RecordingMeta::default(), Arc::new(downloads))
    }

    #[test]
    fn account_ids_are_prefixed_once() {
        assert_eq!(account_path("123"), "act_123");
        assert_eq!(account_path("act_123"), "act_123");
    }

    #[test]
    fn adset_budget_is_a_string_and_times_are_unix_seconds() {
        let start = DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let params = adset_params(None, "c1", 2500, Some(start), None);
        assert_eq!(params["daily_budget"], "2500");
        assert_eq!(params["start_time"], 1714521600);
        assert!(params.get("end_time").is_none());
        assert_eq!(params["targeting"]["geo_locations"]["countries"][0], "US");
    }

    #[tokio::test]
    async fn create_ad_builds_full_chain_with_defaults() {
        let svc = service(CannedDownloads::default());
        let result = svc.create_ad("tok", &ad_request()).await.unwrap();
        assert_eq!(
            result,
            AdResult {
                ad_id: "ads-4".to_string(),
                campaign_id: "campaigns-1".to_string(),
                adset_id: "adsets-2".to_string(),
            }
        );

        let calls = svc.api().calls.lock().unwrap();
        assert!(calls.iter().all(|c| c.0 == "act_123"));
        assert_eq!(calls[0].2["name"], "Generated Campaign");
        assert_eq!(calls[0].2["objective"], "LINK_CLICKS");
        assert_eq!(calls[1].2["daily_budget"], "1000");
        let spec = &calls[2].2["object_story_spec"];
        assert_eq!(spec["link_data"]["image_hash"], "abc");
        assert_eq!(spec["link_data"]["call_to_action"]["type"], "LEARN_MORE");
        assert!(spec.get("video_data").is_none());
        assert_eq!(calls[3].2["creative"]["creative_id"], "adcreatives-3");
        assert_eq!(calls[3].2["status"], "PAUSED");
    }

    #[tokio::test]
    async fn existing_campaign_and_adset_are_reused() {
        let svc = service(CannedDownloads::default());
        let mut request = ad_request();
        request.campaign_id = Some("c9".to_string());
        request.adset_id = Some("s9".to_string());

        let result = svc.create_ad("tok", &request).await.unwrap();
        assert_eq!(result.campaign_id, "c9");
        assert_eq!(result.adset_id, "s9");
        let calls = svc.api().calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].2["adset_id"], "s9");
    }

    #[tokio::test]
    async fn publish_uploads_video_and_references_it() {
        let svc = service(CannedDownloads::default().with("https://cdn/ad.mp4", b"video-bytes"));
        let config: CampaignConfig = serde_json::from_value(json!({
            "user_id": "u1",
            "ad_account_id": "123",
            "page_id": "p1",
            "headline": "h",
            "body": "b",
            "link_url": "https://l",
            "asset_url": "https://cdn/ad.mp4",
            "end_time": "2024-05-02T00:00:00Z"
        }))
        .unwrap();

        svc.publish_ad("tok", &config).await.unwrap();

        let uploads = svc.api().uploads.lock().unwrap();
        assert_eq!(uploads[0], ("video".to_string(), "act_123".to_string(), 11));
        let calls = svc.api().calls.lock().unwrap();
        assert_eq!(calls[1].2["end_time"], 1714608000);
        let spec = &calls[2].2["object_story_spec"];
        assert_eq!(spec["video_data"]["video_id"], "video-1");
        assert!(spec["link_data"].get("image_hash").is_none());
    }

    #[tokio::test]
    async fn publish_rejects_unknown_asset_type() {
        let svc = service(CannedDownloads::default());
        let mut config: CampaignConfig = serde_json::from_value(json!({
            "user_id": "u1", "ad_account_id": "1", "page_id": "p", "headline": "h",
            "body": "b", "link_url": "l", "asset_url": "https://cdn/x"
        }))
        .unwrap();
        config.asset_type = "gif".to_string();
        assert!(matches!(
            svc.publish_ad("tok", &config).await,
            Err(MetaError::InvalidInput(_))
        ));
        assert!(svc.api().calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn image_upload_merges_hash_into_link_data() {
        let svc = service(CannedDownloads::default().with("https://cdn/a.png", b"png"));
        let mut config: CampaignConfig = serde_json::from_value(json!({
            "user_id": "u1", "ad_account_id": "1", "page_id": "p", "headline": "h",
            "body": "b", "link_url": "l", "asset_url": "https://cdn/a.png", "asset_type": "image"
        }))
        .unwrap();
        config.adset_id = Some("s1".to_string());

        svc.publish_ad("tok", &config).await.unwrap();
        let calls = svc.api().calls.lock().unwrap();
        assert_eq!(calls[1].2["object_story_spec"]["link_data"]["image_hash"], "hash-1");
    }
}
