use std::path::{Path, PathBuf};

use crate::error::{ClipstackError, ClipstackResult};

/// Result of container normalization. Conversion failure is a documented
/// fallback, not an error: the caller keeps working with the original path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// Already a native container; nothing ran.
    NotNeeded(PathBuf),
    /// Converted successfully; path points at the new `.mp4`.
    Converted(PathBuf),
    /// The converter exited nonzero; keep the original input.
    Failed { original: PathBuf, detail: String },
}

impl ConversionOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::NotNeeded(p) | Self::Converted(p) => p,
            Self::Failed { original, .. } => original,
        }
    }
}

pub fn needs_conversion(path: &Path) -> bool {
    !has_extension(path, "mp4")
}

pub fn converted_path(input: &Path) -> PathBuf {
    input.with_extension("mp4")
}

/// Re-containerize a video to mp4 via the system ffmpeg binary.
///
/// The original file is left in place: callers fall back to it if the
/// converted file never becomes readable, and only remove it once the
/// replacement has passed its readiness check.
pub fn normalize_container(input: &Path) -> ClipstackResult<ConversionOutcome> {
    if !needs_conversion(input) {
        return Ok(ConversionOutcome::NotNeeded(input.to_path_buf()));
    }

    let output = converted_path(input);
    tracing::info!(input = %input.display(), output = %output.display(), "converting container to mp4");

    let out = std::process::Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-i"])
        .arg(input)
        .args(["-vcodec", "libx264", "-acodec", "aac"])
        .arg(&output)
        .output()
        .map_err(|e| ClipstackError::media(format!("failed to run ffmpeg for conversion: {e}")))?;

    if !out.status.success() {
        let detail = format!(
            "ffmpeg conversion exited with {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        );
        tracing::warn!(input = %input.display(), %detail, "conversion failed, keeping original");
        return Ok(ConversionOutcome::Failed {
            original: input.to_path_buf(),
            detail,
        });
    }

    Ok(ConversionOutcome::Converted(output))
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mp4_needs_no_conversion() {
        assert!(!needs_conversion(Path::new("a/session.mp4")));
        assert!(!needs_conversion(Path::new("a/SESSION.MP4")));
        assert!(needs_conversion(Path::new("a/session.mov")));
        assert!(needs_conversion(Path::new("a/session.avi")));
        assert!(needs_conversion(Path::new("a/session")));
    }

    #[test]
    fn converted_path_swaps_extension() {
        assert_eq!(
            converted_path(Path::new("in/clip.mov")),
            PathBuf::from("in/clip.mp4")
        );
    }

    #[test]
    fn outcome_path_always_points_at_something_usable() {
        let ok = ConversionOutcome::Converted(PathBuf::from("x.mp4"));
        assert_eq!(ok.path(), Path::new("x.mp4"));
        let failed = ConversionOutcome::Failed {
            original: PathBuf::from("x.mov"),
            detail: "boom".into(),
        };
        assert_eq!(failed.path(), Path::new("x.mov"));
    }
}
