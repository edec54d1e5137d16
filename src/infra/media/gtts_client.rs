use async_trait::async_trait;
use reqwest::Client;

use crate::core::ads::{SpeechSynth, VideoError};

const TTS_URL: &str = "https://translate.google.com/translate_tts";
/// The endpoint rejects longer `q` values.
const MAX_CHUNK_CHARS: usize = 200;

/// Google Translate speech, the same voice gTTS produces. MP3 frames can be
/// concatenated, so long text is fetched in chunks and joined.
pub struct GttsClient {
    client: Client,
    lang: String,
}

impl GttsClient {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            lang: lang.into(),
        }
    }
}

impl Default for GttsClient {
    fn default() -> Self {
        Self::new("en")
    }
}

/// Splits on whitespace so that no chunk exceeds `max` characters. A single
/// word longer than `max` is cut.
pub fn chunk_text(text: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > max {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let head: String = word.chars().take(max).collect();
            word = word.chars().skip(max).collect();
            chunks.push(head);
        }
        let needed = usize::from(!current.is_empty()) + word.chars().count();
        if current.chars().count() + needed > max {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[async_trait]
impl SpeechSynth for GttsClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VideoError> {
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(VideoError::Tts("nothing to say".to_string()));
        }

        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let total = chunks.len().to_string();
            let idx = idx.to_string();
            let response = self
                .client
                .get(TTS_URL)
                .query(&[
                    ("ie", "UTF-8"),
                    ("q", chunk.as_str()),
                    ("tl", self.lang.as_str()),
                    ("client", "tw-ob"),
                    ("total", total.as_str()),
                    ("idx", idx.as_str()),
                ])
                .send()
                .await
                .map_err(|e| VideoError::Tts(e.to_string()))?;
            if !response.status().is_success() {
                return Err(VideoError::Tts(format!("speech endpoint returned {}", response.status())));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| VideoError::Tts(e.to_string()))?;
            audio.extend_from_slice(&bytes);
        }
        Ok(audio)
    }
}
