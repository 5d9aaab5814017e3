use std::path::{Path, PathBuf};

use crate::error::{ClipstackError, ClipstackResult};

/// An opened video source: identity plus the stream facts every later stage
/// needs. Probed once via `ffprobe`; frames are decoded on demand from the
/// same path. The stage that opens a source owns it; segments only borrow it.
#[derive(Clone, Debug)]
pub struct VideoSource {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps_num: u32,
    pub fps_den: u32,
    pub duration_sec: f64,
}

impl VideoSource {
    pub fn probe(path: &Path) -> ClipstackResult<Self> {
        let out = std::process::Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .output()
            .map_err(|e| ClipstackError::media(format!("failed to run ffprobe: {e}")))?;
        if !out.status.success() {
            return Err(ClipstackError::media(format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        parse_probe_output(path, &out.stdout)
    }

    pub fn source_fps(&self) -> f64 {
        if self.fps_den == 0 {
            0.0
        } else {
            f64::from(self.fps_num) / f64::from(self.fps_den)
        }
    }
}

pub(crate) fn parse_probe_output(path: &Path, stdout: &[u8]) -> ClipstackResult<VideoSource> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut = serde_json::from_slice(stdout)
        .map_err(|e| ClipstackError::media(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| {
            ClipstackError::media(format!("no video stream found in '{}'", path.display()))
        })?;
    let width = video_stream
        .width
        .ok_or_else(|| ClipstackError::media("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| ClipstackError::media("missing video height from ffprobe"))?;
    if width == 0 || height == 0 {
        return Err(ClipstackError::media(format!(
            "degenerate video dimensions {width}x{height} in '{}'",
            path.display()
        )));
    }

    let (fps_num, fps_den) = parse_ff_ratio(video_stream.r_frame_rate.as_deref().unwrap_or("0/1"))
        .ok_or_else(|| ClipstackError::media("invalid video r_frame_rate"))?;
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(VideoSource {
        path: path.to_path_buf(),
        width,
        height,
        fps_num,
        fps_den,
        duration_sec,
    })
}

fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if a == 0 || b == 0 {
        return None;
    }
    Some((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"codec_type": "audio", "sample_rate": "44100"},
            {"codec_type": "video", "width": 1920, "height": 1080, "r_frame_rate": "30000/1001"}
        ],
        "format": {"duration": "25.12"}
    }"#;

    #[test]
    fn parses_probe_json() {
        let src = parse_probe_output(Path::new("a.mp4"), SAMPLE.as_bytes()).unwrap();
        assert_eq!(src.width, 1920);
        assert_eq!(src.height, 1080);
        assert_eq!((src.fps_num, src.fps_den), (30000, 1001));
        assert!((src.duration_sec - 25.12).abs() < 1e-9);
        assert!((src.source_fps() - 29.97).abs() < 0.01);
    }

    #[test]
    fn rejects_sources_without_video_stream() {
        let json = br#"{"streams": [{"codec_type": "audio"}], "format": {}}"#;
        assert!(matches!(
            parse_probe_output(Path::new("a.mp4"), json),
            Err(ClipstackError::Media(_))
        ));
    }

    #[test]
    fn rejects_zero_dimensions() {
        let json = br#"{"streams": [{"codec_type": "video", "width": 0, "height": 720, "r_frame_rate": "30/1"}]}"#;
        assert!(parse_probe_output(Path::new("a.mp4"), json).is_err());
    }

    #[test]
    fn ratio_parsing_rejects_zero_terms() {
        assert_eq!(parse_ff_ratio("30/1"), Some((30, 1)));
        assert_eq!(parse_ff_ratio("0/1"), None);
        assert_eq!(parse_ff_ratio("30/0"), None);
        assert_eq!(parse_ff_ratio("garbage"), None);
    }
}
