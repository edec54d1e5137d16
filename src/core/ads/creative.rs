use std::sync::Arc;

use thiserror::Error;

use crate::core::ai::models::dalle_size;
use crate::core::ai::ai_service::image_prompt;
use crate::core::ai::{AiError, ImageGenerator, ImageRequest};
use crate::core::storage::{Downloader, ObjectStore, StorageError};

#[derive(Debug, Error)]
pub enum CreativeError {
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// DALL-E image → our bucket, so the ad never points at a short-lived
/// OpenAI URL.
pub struct AdImageService {
    images: Arc<dyn ImageGenerator>,
    downloader: Arc<dyn Downloader>,
    store: Arc<dyn ObjectStore>,
}

impl AdImageService {
    pub fn new(
        images: Arc<dyn ImageGenerator>,
        downloader: Arc<dyn Downloader>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            images,
            downloader,
            store,
        }
    }

    pub async fn generate(&self, request: &ImageRequest) -> Result<String, CreativeError> {
        request.validate()?;
        let size = dalle_size(&request.aspect_ratio)
            .ok_or_else(|| AiError::InvalidInput(format!("unsupported aspect ratio {}", request.aspect_ratio)))?;

        let prompt = image_prompt(request);
        let source = self
            .images
            .generate_image(&prompt, size, &request.quality)
            .await?;
        let bytes = self.downloader.download(&source).await?;

        let key = format!("generated_ads/{}.png", uuid::Uuid::new_v4());
        let url = self.store.put_object(&key, bytes, "image/png").await?;
        tracing::info!(key = %key, size, "Stored generated ad image");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::object_store::fake_downloads::CannedDownloads;
    use crate::core::storage::object_store::testing::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FixedImage {
        calls: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl ImageGenerator for FixedImage {
        async fn generate_image(&self, prompt: &str, size: &str, quality: &str) -> Result<String, AiError> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.into(), size.into(), quality.into()));
            Ok("https://oai/img.png".to_string())
        }
    }

    fn request(ratio: &str) -> ImageRequest {
        ImageRequest {
            prompt: "a red sneaker".to_string(),
            aspect_ratio: ratio.to_string(),
            style: Some("neon".to_string()),
            branding_elements: None,
            quality: "hd".to_string(),
        }
    }

    #[tokio::test]
    async fn image_lands_under_generated_ads() {
        let images = Arc::new(FixedImage::default());
        let store = Arc::new(MemoryStore::default());
        let service = AdImageService::new(
            images.clone(),
            Arc::new(CannedDownloads::default().with("https://oai/img.png", b"png")),
            store.clone(),
        );

        let url = service.generate(&request("9:16")).await.unwrap();
        assert!(url.contains("generated_ads/"));
        assert!(url.ends_with(".png"));
        let calls = images.calls.lock().unwrap();
        assert_eq!(calls[0].0, "a red sneaker, in a neon style");
        assert_eq!(calls[0].1, "1024x1792");
        assert_eq!(calls[0].2, "hd");
    }

    #[tokio::test]
    async fn bad_ratio_is_rejected_before_any_call() {
        let images = Arc::new(FixedImage::default());
        let service = AdImageService::new(
            images.clone(),
            Arc::new(CannedDownloads::default()),
            Arc::new(MemoryStore::default()),
        );
        let err = service.generate(&request("2:1")).await.unwrap_err();
        assert!(matches!(err, CreativeError::Ai(AiError::InvalidInput(_))));
        assert!(images.calls.lock().unwrap().is_empty());
    }
}
