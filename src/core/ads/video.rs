// Composing ad videos from scenes.
//
// Assets are fetched into a scratch directory, a `Timeline` is planned from the
// template, and an external renderer turns the timeline into an mp4 that is
// then stored publicly.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::templates::{find_template, VideoTemplate, DEFAULT_FONT_SIZE};
use crate::core::storage::{Downloader, ObjectStore, StorageError};

pub const MOCK_RENDER_PLACEHOLDER: &str = "https://example.com/rendered_3d_model_placeholder.mp4";

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Text-to-speech failed: {0}")]
    Tts(String),
    #[error("Rendering failed: {0}")]
    Render(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoScene {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    pub duration: f64,
    #[serde(default)]
    pub tts_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRequest {
    pub scenes: Vec<VideoScene>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_template")]
    pub template_id: String,
    #[serde(default)]
    pub model_url: Option<String>,
}

fn default_width() -> u32 {
    720
}
fn default_height() -> u32 {
    1280
}
fn default_fps() -> u32 {
    30
}
fn default_template() -> String {
    "standard".to_string()
}

impl VideoRequest {
    pub fn validate(&self) -> Result<(), VideoError> {
        if let Some(i) = self.scenes.iter().position(|s| !(s.duration > 0.0)) {
            return Err(VideoError::InvalidInput(format!(
                "scenes[{i}].duration must be greater than 0"
            )));
        }
        if self.width == 0 || self.height == 0 || self.fps == 0 {
            return Err(VideoError::InvalidInput(
                "width, height and fps must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Visual {
    Clip(PathBuf),
    Image(PathBuf),
    Black,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub text: String,
    pub font_size: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub visual: Visual,
    pub caption: Option<Caption>,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NarrationTrack {
    pub path: PathBuf,
    /// Each clip is cut or padded to its scene's length.
    pub duration: f64,
}

/// Everything the renderer needs, in playback order.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub segments: Vec<Segment>,
    pub narration: Vec<NarrationTrack>,
    /// When set, the concatenated narration is trimmed or looped to this length.
    pub fit_narration_to: Option<f64>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Timeline {
    pub fn duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }
}

/// Local files fetched for one request. Vectors are indexed like the scenes.
#[derive(Debug, Clone, Default)]
pub struct SceneAssets {
    pub intro_clip: Option<PathBuf>,
    pub images: Vec<Option<PathBuf>>,
    pub narration: Vec<Option<PathBuf>>,
}

pub fn plan_timeline(template: &VideoTemplate, request: &VideoRequest, assets: &SceneAssets) -> Timeline {
    let mut segments = Vec::new();

    if let Some(clip) = &assets.intro_clip {
        if template.intro_secs > 0.0 {
            segments.push(Segment {
                visual: Visual::Clip(clip.clone()),
                caption: None,
                duration: template.intro_secs,
            });
        }
    }

    let mut narration = Vec::new();
    for (i, scene) in request.scenes.iter().enumerate() {
        if scene.duration <= 0.0 {
            continue;
        }
        let visual = match assets.images.get(i).cloned().flatten() {
            Some(path) => Visual::Image(path),
            None => Visual::Black,
        };
        let caption = scene
            .text
            .as_ref()
            .filter(|t| !t.is_empty())
            .map(|text| Caption {
                text: text.clone(),
                font_size: DEFAULT_FONT_SIZE,
            });
        segments.push(Segment {
            visual,
            caption,
            duration: scene.duration,
        });
        if let Some(path) = assets.narration.get(i).cloned().flatten() {
            narration.push(NarrationTrack {
                path,
                duration: scene.duration,
            });
        }
    }

    segments.push(Segment {
        visual: Visual::Black,
        caption: Some(Caption {
            text: template.outro_text.to_string(),
            font_size: template.font_size,
        }),
        duration: template.outro_secs,
    });

    if let Some(total) = template.total_secs {
        fit_segments(&mut segments, total);
    }

    Timeline {
        segments,
        fit_narration_to: template.total_secs,
        narration,
        width: request.width,
        height: request.height,
        fps: request.fps,
    }
}

/// Cuts the tail when the segments run long, pads with black when short.
fn fit_segments(segments: &mut Vec<Segment>, total: f64) {
    let mut elapsed = 0.0;
    let mut keep = 0;
    for segment in segments.iter_mut() {
        if elapsed >= total {
            break;
        }
        if elapsed + segment.duration > total {
            segment.duration = total - elapsed;
        }
        elapsed += segment.duration;
        keep += 1;
    }
    if keep < segments.len() {
        tracing::info!(total, "Video trimmed to template length");
    }
    segments.truncate(keep);

    let short_by = total - elapsed;
    if short_by > f64::EPSILON {
        tracing::info!(total, filler = short_by, "Video extended with filler");
        segments.push(Segment {
            visual: Visual::Black,
            caption: None,
            duration: short_by,
        });
    }
}

#[async_trait]
pub trait VideoRenderer: Send + Sync {
    /// Writes an H.264/AAC mp4 for `timeline` to `output`. `workdir` may be
    /// used for scratch files.
    async fn render(&self, timeline: &Timeline, workdir: &Path, output: &Path) -> Result<(), VideoError>;
}

#[async_trait]
pub trait SpeechSynth: Send + Sync {
    /// Returns MP3 bytes for `text`.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VideoError>;
}

/// Produces a turntable clip of a 3D model.
#[async_trait]
pub trait ModelRenderer: Send + Sync {
    async fn render_model(&self, model_url: &str) -> Result<String, VideoError>;
}

/// Stand-in for a real 3D render farm. Returns a configured clip url.
pub struct MockModelRenderer {
    url: Option<String>,
}

impl MockModelRenderer {
    pub fn new(url: Option<String>) -> Self {
        Self { url }
    }
}

#[async_trait]
impl ModelRenderer for MockModelRenderer {
    async fn render_model(&self, model_url: &str) -> Result<String, VideoError> {
        tracing::info!(model_url, animation = "turntable", "[3D Render Mock] Requesting render");
        match &self.url {
            Some(url) => Ok(url.clone()),
            None => {
                tracing::warn!("MOCK_RENDERED_3D_VIDEO_URL not set. Using generic placeholder.");
                Ok(MOCK_RENDER_PLACEHOLDER.to_string())
            }
        }
    }
}

pub struct VideoService {
    downloader: Arc<dyn Downloader>,
    tts: Arc<dyn SpeechSynth>,
    models: Arc<dyn ModelRenderer>,
    renderer: Arc<dyn VideoRenderer>,
    store: Arc<dyn ObjectStore>,
}

impl VideoService {
    pub fn new(
        downloader: Arc<dyn Downloader>,
        tts: Arc<dyn SpeechSynth>,
        models: Arc<dyn ModelRenderer>,
        renderer: Arc<dyn VideoRenderer>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            downloader,
            tts,
            models,
            renderer,
            store,
        }
    }

    /// Builds the video and returns its public URL.
    pub async fn generate(&self, request: &VideoRequest) -> Result<String, VideoError> {
        request.validate()?;
        let template = find_template(&request.template_id);
        if let Some(url) = template.placeholder_url() {
            tracing::info!(template = template.id, url = %url, "Using template placeholder video");
            return Ok(url);
        }

        // Dropped at the end of this call, success or not, taking every
        // downloaded asset and the rendered file with it.
        let workdir = tempfile::tempdir()?;
        let assets = self.fetch_assets(&template, request, workdir.path()).await?;
        let timeline = plan_timeline(&template, request, &assets);

        let output = workdir.path().join("final.mp4");
        self.renderer.render(&timeline, workdir.path(), &output).await?;

        let bytes = tokio::fs::read(&output).await?;
        let key = format!("generated_videos/{}.mp4", uuid::Uuid::new_v4());
        let url = self.store.put_object(&key, bytes, "video/mp4").await?;
        tracing::info!(url = %url, seconds = timeline.duration(), "Video uploaded");
        Ok(url)
    }

    async fn fetch_assets(
        &self,
        template: &VideoTemplate,
        request: &VideoRequest,
        workdir: &Path,
    ) -> Result<SceneAssets, VideoError> {
        let mut assets = SceneAssets::default();

        if let Some(model_url) = request.model_url.as_deref().filter(|u| !u.is_empty()) {
            if template.intro_secs > 0.0 {
                match self.fetch_intro(model_url, workdir).await {
                    Ok(path) => {
                        tracing::info!("3D model video integrated into final ad");
                        assets.intro_clip = Some(path);
                    }
                    Err(e) => tracing::error!(error = %e, "3D render integration failed"),
                }
            }
        }

        for (i, scene) in request.scenes.iter().enumerate() {
            let image = match scene.image_url.as_deref().filter(|u| !u.is_empty()) {
                Some(url) => {
                    let bytes = self.downloader.download(url).await?;
                    let path = workdir.join(format!("scene_{i}.png"));
                    tokio::fs::write(&path, bytes).await?;
                    Some(path)
                }
                None => None,
            };
            assets.images.push(image);

            let narration = match scene.tts_text.as_deref().filter(|t| !t.is_empty()) {
                Some(text) => {
                    let bytes = self.tts.synthesize(text).await?;
                    let path = workdir.join(format!("scene_{i}.mp3"));
                    tokio::fs::write(&path, bytes).await?;
                    Some(path)
                }
                None => None,
            };
            assets.narration.push(narration);
        }

        Ok(assets)
    }

    async fn fetch_intro(&self, model_url: &str, workdir: &Path) -> Result<PathBuf, VideoError> {
        let clip_url = self.models.render_model(model_url).await?;
        let bytes = self.downloader.download(&clip_url).await?;
        let path = workdir.join("model_intro.mp4");
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::object_store::fake_downloads::CannedDownloads;
    use crate::core::storage::object_store::testing::MemoryStore;
    use std::sync::Mutex;

    fn scene(duration: f64, image: Option<&str>, text: Option<&str>, tts: Option<&str>) -> VideoScene {
        VideoScene {
            image_url: image.map(str::to_string),
            text: text.map(str::to_string),
            duration,
            tts_text: tts.map(str::to_string),
        }
    }

    fn request(template: &str, scenes: Vec<VideoScene>) -> VideoRequest {
        VideoRequest {
            scenes,
            width: 720,
            height: 1280,
            fps: 30,
            template_id: template.to_string(),
            model_url: None,
        }
    }

    #[test]
    fn request_defaults_apply() {
        let req: VideoRequest =
            serde_json::from_str(r#"{"scenes":[{"duration":2.5}]}"#).unwrap();
        assert_eq!((req.width, req.height, req.fps), (720, 1280, 30));
        assert_eq!(req.template_id, "standard");
    }

    #[test]
    fn zero_duration_scene_is_rejected() {
        let req = request("standard", vec![scene(0.0, None, None, None)]);
        assert!(matches!(req.validate(), Err(VideoError::InvalidInput(_))));
    }

    #[test]
    fn short_timeline_is_padded_to_template_length() {
        let req = request("fast_paced", vec![scene(4.0, None, Some("Hi"), None)]);
        let assets = SceneAssets {
            images: vec![None],
            narration: vec![None],
            ..Default::default()
        };
        let timeline = plan_timeline(&find_template("fast_paced"), &req, &assets);

        assert_eq!(timeline.segments.len(), 3);
        assert_eq!(timeline.segments[0].caption.as_ref().unwrap().font_size, 48);
        let outro = &timeline.segments[1];
        assert_eq!(outro.caption.as_ref().unwrap().text, "Check it out now!");
        assert_eq!(outro.caption.as_ref().unwrap().font_size, 40);
        assert_eq!(timeline.segments[2].visual, Visual::Black);
        assert!((timeline.duration() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn long_timeline_is_trimmed() {
        let req = request(
            "fast_paced",
            vec![scene(10.0, None, None, None), scene(10.0, None, None, None)],
        );
        let timeline = plan_timeline(&find_template("fast_paced"), &req, &SceneAssets::default());

        assert_eq!(timeline.segments.len(), 2);
        assert_eq!(timeline.segments[1].duration, 5.0);
        assert!((timeline.duration() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_template_keeps_natural_length() {
        let req = request("custom", vec![scene(3.0, None, None, Some("hello"))]);
        let assets = SceneAssets {
            images: vec![None],
            narration: vec![Some(PathBuf::from("a.mp3"))],
            ..Default::default()
        };
        let timeline = plan_timeline(&find_template("custom"), &req, &assets);
        assert!((timeline.duration() - 5.0).abs() < 1e-9);
        assert_eq!(timeline.fit_narration_to, None);
        assert_eq!(timeline.narration[0].duration, 3.0);
    }

    #[test]
    fn intro_clip_uses_template_intro_length() {
        let req = request("luxury_showcase", vec![scene(5.0, None, None, None)]);
        let assets = SceneAssets {
            intro_clip: Some(PathBuf::from("intro.mp4")),
            images: vec![None],
            narration: vec![None],
        };
        let timeline = plan_timeline(&find_template("luxury_showcase"), &req, &assets);
        assert_eq!(timeline.segments[0].visual, Visual::Clip(PathBuf::from("intro.mp4")));
        assert_eq!(timeline.segments[0].duration, 5.0);
    }

    struct SilentTts;

    #[async_trait]
    impl SpeechSynth for SilentTts {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, VideoError> {
            Ok(b"ID3".to_vec())
        }
    }

    /// Writes a stub file and keeps the planned timeline for inspection.
    #[derive(Default)]
    struct RecordingRenderer {
        timelines: Mutex<Vec<Timeline>>,
    }

    #[async_trait]
    impl VideoRenderer for RecordingRenderer {
        async fn render(&self, timeline: &Timeline, _workdir: &Path, output: &Path) -> Result<(), VideoError> {
            for segment in &timeline.segments {
                if let Visual::Image(path) | Visual::Clip(path) = &segment.visual {
                    assert!(path.exists());
                }
            }
            self.timelines.lock().unwrap().push(timeline.clone());
            tokio::fs::write(output, b"mp4").await?;
            Ok(())
        }
    }

    fn service(
        downloads: CannedDownloads,
        renderer: Arc<RecordingRenderer>,
        store: Arc<MemoryStore>,
    ) -> VideoService {
        VideoService::new(
            Arc::new(downloads),
            Arc::new(SilentTts),
            Arc::new(MockModelRenderer::new(Some("https://cdn/turntable.mp4".into()))),
            renderer,
            store,
        )
    }

    #[tokio::test]
    async fn placeholder_template_skips_rendering() {
        let renderer = Arc::new(RecordingRenderer::default());
        let store = Arc::new(MemoryStore::default());
        let svc = service(CannedDownloads::default(), renderer.clone(), store.clone());

        let url = svc
            .generate(&request("anime_10s", vec![scene(1.0, None, None, None)]))
            .await
            .unwrap();
        assert_eq!(url, "https://example.com/anime_10s.mp4");
        assert!(renderer.timelines.lock().unwrap().is_empty());
        assert!(store.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn composed_video_is_rendered_and_uploaded() {
        let downloads = CannedDownloads::default()
            .with("https://img/1.png", b"png")
            .with("https://cdn/turntable.mp4", b"clip");
        let renderer = Arc::new(RecordingRenderer::default());
        let store = Arc::new(MemoryStore::default());
        let svc = service(downloads, renderer.clone(), store.clone());

        let mut req = request(
            "standard",
            vec![scene(4.0, Some("https://img/1.png"), Some("Buy"), Some("Buy now"))],
        );
        req.model_url = Some("https://models/chair.glb".to_string());

        let url = svc.generate(&req).await.unwrap();
        assert!(url.contains("/generated_videos/"));
        assert!(url.ends_with(".mp4"));

        let timelines = renderer.timelines.lock().unwrap();
        let timeline = &timelines[0];
        assert!(matches!(timeline.segments[0].visual, Visual::Clip(_)));
        assert!(matches!(timeline.segments[1].visual, Visual::Image(_)));
        assert_eq!(timeline.narration.len(), 1);
        assert_eq!(timeline.fit_narration_to, Some(30.0));

        let objects = store.objects.lock().unwrap();
        assert_eq!(objects[0].2, "video/mp4");
    }

    #[tokio::test]
    async fn failed_intro_render_is_skipped() {
        let downloads = CannedDownloads::default();
        let renderer = Arc::new(RecordingRenderer::default());
        let svc = service(downloads, renderer.clone(), Arc::new(MemoryStore::default()));

        let mut req = request("standard", vec![scene(2.0, None, None, None)]);
        req.model_url = Some("https://models/chair.glb".to_string());
        svc.generate(&req).await.unwrap();

        let timelines = renderer.timelines.lock().unwrap();
        assert!(timelines[0]
            .segments
            .iter()
            .all(|s| !matches!(s.visual, Visual::Clip(_))));
    }

    #[tokio::test]
    async fn missing_scene_image_fails_the_job() {
        let svc = service(
            CannedDownloads::default(),
            Arc::new(RecordingRenderer::default()),
            Arc::new(MemoryStore::default()),
        );
        let req = request("standard", vec![scene(2.0, Some("https://img/gone.png"), None, None)]);
        assert!(matches!(svc.generate(&req).await, Err(VideoError::Storage(_))));
    }
}
