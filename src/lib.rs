//! Clipstack turns a raw video into size-bounded animated artifacts plus a
//! cleaned transcript.
//!
//! # Pipeline overview
//!
//! 1. **Ingest**: scan an input directory, classify subject vs transcript
//!    clip by probed duration
//! 2. **Normalize**: re-containerize foreign formats via the system `ffmpeg`
//!    binary, gated on a file-readiness check
//! 3. **Plan + Transform**: cut the duration into fixed-length segments and
//!    apply the speed-up / crop / resize chain ([`Segment`])
//! 4. **Fit + Encode**: first-fit search over (width scale, palette depth)
//!    candidates until the stacked GIF meets the byte ceiling
//!    ([`SizeFitSearch`])
//! 5. **Transcribe + Clean**: concurrent branch running the external
//!    speech-to-text tool and collapsing its subtitles into a paragraph
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Typed fallbacks**: non-fatal conditions are values
//!   ([`RunWarning`], [`ConversionOutcome`]), never swallowed exceptions.
//! - **Explicit configuration**: everything a run needs arrives in one
//!   [`PipelineConfig`]; there is no process-wide state.
//! - **Subprocess boundaries**: decode, encode, conversion and transcription
//!   all cross into external tools; file handoffs are guarded by the
//!   readiness waiter, never assumed.
#![forbid(unsafe_code)]

pub mod config;
pub mod encode;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod plan;
pub mod readiness;
pub mod storage;
pub mod transcript;
pub mod transform;

pub use config::PipelineConfig;
pub use encode::fit::{ArtifactResult, CandidateGrid, EncodeCandidate, SizeFitSearch};
pub use encode::gif::{
    FfmpegGifEncoder, GifSettings, StackEncoder, StackLayout, compose_stack_frame,
};
pub use encode::split::{encode_split, half_output_paths, split_point};
pub use error::{ClipstackError, ClipstackResult};
pub use media::convert::{ConversionOutcome, normalize_container};
pub use media::probe::VideoSource;
pub use media::{FrameRgba, is_ffmpeg_on_path, is_ffprobe_on_path};
pub use pipeline::{PipelineCoordinator, RunSummary, RunWarning};
pub use plan::{Interval, plan_segments};
pub use readiness::{wait_for_file, wait_for_file_with};
pub use storage::{FsObjectStore, ObjectStore};
pub use transcript::clean::TranscriptCleaner;
pub use transcript::run::{TranscriberConfig, find_subtitle, run_transcription};
pub use transform::{CropBox, RenderedSegment, Segment, aspect_height, resize_frame};
