// Renders a `Timeline` with a single ffmpeg invocation.
//
// Every segment is its own input (looped still, looped clip, or a lavfi black
// source), normalised to the output geometry, optionally captioned, then all
// segments are concatenated. Narration tracks are padded/cut to their scene
// length and concatenated; a fixed-length template loops or trims the result.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::core::ads::video::{Segment, Visual};
use crate::core::ads::{Timeline, VideoError, VideoRenderer};

pub const DEFAULT_FFMPEG: &str = "ffmpeg";

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub args: Vec<String>,
    /// Caption text files that must exist before ffmpeg runs.
    pub captions: Vec<(PathBuf, String)>,
}

pub struct FfmpegRenderer {
    binary: String,
    font_file: Option<String>,
}

impl FfmpegRenderer {
    pub fn new(binary: Option<String>, font_file: Option<String>) -> Self {
        Self {
            binary: binary.unwrap_or_else(|| DEFAULT_FFMPEG.to_string()),
            font_file,
        }
    }
}

fn secs(value: f64) -> String {
    format!("{value:.3}")
}

/// Escapes a path for use inside a filter option value.
fn filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

fn segment_input(args: &mut Vec<String>, segment: &Segment, timeline: &Timeline) {
    let duration = secs(segment.duration);
    match &segment.visual {
        Visual::Clip(path) => {
            args.extend(["-stream_loop", "-1", "-t"].map(String::from));
            args.push(duration);
            args.push("-i".into());
            args.push(path.to_string_lossy().into_owned());
        }
        Visual::Image(path) => {
            args.extend(["-loop", "1", "-t"].map(String::from));
            args.push(duration);
            args.push("-i".into());
            args.push(path.to_string_lossy().into_owned());
        }
        Visual::Black => {
            args.extend(["-f", "lavfi", "-t"].map(String::from));
            args.push(duration);
            args.push("-i".into());
            args.push(format!(
                "color=c=black:s={}x{}:r={}",
                timeline.width, timeline.height, timeline.fps
            ));
        }
    }
}

pub fn plan_ffmpeg(timeline: &Timeline, workdir: &Path, output: &Path, font_file: Option<&str>) -> RenderPlan {
    let mut args: Vec<String> = vec!["-y".into(), "-hide_banner".into()];
    let mut captions = Vec::new();
    let mut filters = String::new();
    let (w, h, fps) = (timeline.width, timeline.height, timeline.fps);

    for segment in &timeline.segments {
        segment_input(&mut args, segment, timeline);
    }
    let audio_base = timeline.segments.len();
    for track in &timeline.narration {
        args.push("-i".into());
        args.push(track.path.to_string_lossy().into_owned());
    }

    for (i, segment) in timeline.segments.iter().enumerate() {
        let _ = write!(
            filters,
            "[{i}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps},format=yuv420p,trim=duration={},setpts=PTS-STARTPTS",
            secs(segment.duration)
        );
        if let Some(caption) = &segment.caption {
            let path = workdir.join(format!("caption_{i}.txt"));
            let _ = write!(
                filters,
                ",drawtext=textfile='{}':fontcolor=white:fontsize={}:x=(w-text_w)/2:y=(h-text_h)/2",
                filter_path(&path),
                caption.font_size
            );
            if let Some(font) = font_file {
                let _ = write!(filters, ":fontfile='{}'", filter_path(Path::new(font)));
            }
            captions.push((path, caption.text.clone()));
        }
        let _ = write!(filters, "[v{i}];");
    }
    for i in 0..timeline.segments.len() {
        let _ = write!(filters, "[v{i}]");
    }
    let _ = write!(filters, "concat=n={}:v=1:a=0[vout]", timeline.segments.len());

    let has_audio = !timeline.narration.is_empty();
    if has_audio {
        for (j, track) in timeline.narration.iter().enumerate() {
            let _ = write!(
                filters,
                ";[{}:a]apad,atrim=end={},asetpts=PTS-STARTPTS[a{j}]",
                audio_base + j,
                secs(track.duration)
            );
        }
        filters.push(';');
        for j in 0..timeline.narration.len() {
            let _ = write!(filters, "[a{j}]");
        }
        let _ = write!(filters, "concat=n={}:v=0:a=1", timeline.narration.len());
        match timeline.fit_narration_to {
            Some(total) => {
                let _ = write!(
                    filters,
                    "[acat];[acat]aloop=loop=-1:size=2147483647,atrim=end={},asetpts=PTS-STARTPTS[aout]",
                    secs(total)
                );
            }
            None => filters.push_str("[aout]"),
        }
    }

    args.push("-filter_complex".into());
    args.push(filters);
    args.extend(["-map", "[vout]"].map(String::from));
    if has_audio {
        args.extend(["-map", "[aout]", "-c:a", "aac"].map(String::from));
    }
    args.extend(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-r"].map(String::from));
    args.push(fps.to_string());
    args.push(output.to_string_lossy().into_owned());

    RenderPlan { args, captions }
}

#[async_trait]
impl VideoRenderer for FfmpegRenderer {
    async fn render(&self, timeline: &Timeline, workdir: &Path, output: &Path) -> Result<(), VideoError> {
        if timeline.segments.is_empty() {
            return Err(VideoError::Render("nothing to render".to_string()));
        }
        let plan = plan_ffmpeg(timeline, workdir, output, self.font_file.as_deref());
        for (path, text) in &plan.captions {
            tokio::fs::write(path, text).await?;
        }

        tracing::info!(
            segments = timeline.segments.len(),
            narration = timeline.narration.len(),
            seconds = timeline.duration(),
            "Rendering video"
        );
        let result = Command::new(&self.binary)
            .args(&plan.args)
            .output()
            .await
            .map_err(|e| VideoError::Render(format!("could not start {}: {e}", self.binary)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: String = stderr
                .lines()
                .rev()
                .take(10)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("\n");
            return Err(VideoError::Render(format!("ffmpeg exited with {}: {tail}", result.status)));
        }
        Ok(())
    }
}
