pub mod ffmpeg_renderer;
pub mod gtts_client;
pub mod http_downloader;
pub mod s3_store;

pub use ffmpeg_renderer::FfmpegRenderer;
pub use gtts_client::GttsClient;
pub use http_downloader::HttpDownloader;
pub use s3_store::S3Store;
