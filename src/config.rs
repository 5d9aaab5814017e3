use std::{path::PathBuf, time::Duration};

use crate::{
    encode::fit::CandidateGrid,
    error::{ClipstackError, ClipstackResult},
    readiness,
    transcript::run::TranscriberConfig,
    transform::CropBox,
};

pub const DEFAULT_SEGMENT_SEC: f64 = 10.0;
pub const DEFAULT_TAIL_GUARD_SEC: f64 = 0.5;
pub const DEFAULT_SPEED: f64 = 1.5;
pub const DEFAULT_CEILING_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_BASE_WIDTH_DIVISOR: u32 = 2;

/// Everything one pipeline run needs, passed explicitly into
/// [`PipelineCoordinator::new`](crate::pipeline::PipelineCoordinator::new).
/// There is deliberately no process-wide configuration state.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Directory scanned for the subject video, the optional transcript clip
    /// and the optional companion image.
    pub input_dir: PathBuf,
    /// Directory all outputs land in.
    pub output_dir: PathBuf,
    /// Artifact path template relative to `output_dir`; the split inserts
    /// `1`/`2` before the extension.
    pub artifact_name: String,
    /// Final name of the cleaned transcript inside `output_dir`.
    pub published_transcript_name: String,
    pub segment_sec: f64,
    pub tail_guard_sec: f64,
    /// Temporal speed-up applied to every segment.
    pub speed: f64,
    /// Centered crop window, applied before resize when the source exceeds it.
    pub crop: Option<CropBox>,
    /// The base output width is `source_width / base_width_divisor`.
    pub base_width_divisor: u32,
    pub grid: CandidateGrid,
    pub ceiling_bytes: u64,
    pub readiness_timeout: Duration,
    /// External speech-to-text tool; `None` skips the transcript branch.
    pub transcriber: Option<TranscriberConfig>,
    /// When set, finished outputs are uploaded into this store root.
    pub publish_root: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            artifact_name: "workout.gif".to_string(),
            published_transcript_name: "transcript.txt".to_string(),
            segment_sec: DEFAULT_SEGMENT_SEC,
            tail_guard_sec: DEFAULT_TAIL_GUARD_SEC,
            speed: DEFAULT_SPEED,
            crop: None,
            base_width_divisor: DEFAULT_BASE_WIDTH_DIVISOR,
            grid: CandidateGrid::default(),
            ceiling_bytes: DEFAULT_CEILING_BYTES,
            readiness_timeout: readiness::DEFAULT_TIMEOUT,
            transcriber: None,
            publish_root: None,
        }
    }

    pub fn validate(&self) -> ClipstackResult<()> {
        if self.artifact_name.trim().is_empty() {
            return Err(ClipstackError::invalid_input("artifact name must be non-empty"));
        }
        if self.published_transcript_name.trim().is_empty() {
            return Err(ClipstackError::invalid_input(
                "published transcript name must be non-empty",
            ));
        }
        if !self.segment_sec.is_finite() || self.segment_sec <= 0.0 {
            return Err(ClipstackError::invalid_input(format!(
                "segment length must be > 0, got {}",
                self.segment_sec
            )));
        }
        if !self.tail_guard_sec.is_finite()
            || self.tail_guard_sec < 0.0
            || self.tail_guard_sec >= self.segment_sec
        {
            return Err(ClipstackError::invalid_input(format!(
                "tail guard must satisfy 0 <= guard < segment length, got {}",
                self.tail_guard_sec
            )));
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(ClipstackError::invalid_input(format!(
                "speed factor must be > 0, got {}",
                self.speed
            )));
        }
        if self.base_width_divisor == 0 {
            return Err(ClipstackError::invalid_input("base width divisor must be >= 1"));
        }
        if self.ceiling_bytes == 0 {
            return Err(ClipstackError::invalid_input("size ceiling must be non-zero"));
        }
        if let Some(c) = self.crop {
            if c.width == 0 || c.height == 0 {
                return Err(ClipstackError::invalid_input("crop box must be non-zero"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        PipelineConfig::new("in", "out").validate().unwrap();
    }

    #[test]
    fn validation_catches_bad_values() {
        let base = PipelineConfig::new("in", "out");

        let mut c = base.clone();
        c.artifact_name = "  ".into();
        assert!(c.validate().is_err());

        let mut c = base.clone();
        c.segment_sec = 0.0;
        assert!(c.validate().is_err());

        let mut c = base.clone();
        c.tail_guard_sec = c.segment_sec;
        assert!(c.validate().is_err());

        let mut c = base.clone();
        c.speed = -1.0;
        assert!(c.validate().is_err());

        let mut c = base.clone();
        c.base_width_divisor = 0;
        assert!(c.validate().is_err());

        let mut c = base.clone();
        c.ceiling_bytes = 0;
        assert!(c.validate().is_err());

        let mut c = base;
        c.crop = Some(CropBox { width: 0, height: 720 });
        assert!(c.validate().is_err());
    }
}
