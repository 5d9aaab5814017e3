use std::{cmp::Ordering, fmt, path::PathBuf};

use crate::{
    config::PipelineConfig,
    encode::fit::{ArtifactResult, SizeFitSearch},
    encode::gif::FfmpegGifEncoder,
    encode::split::encode_split,
    error::{ClipstackError, ClipstackResult},
    media::convert::{ConversionOutcome, normalize_container},
    media::probe::VideoSource,
    plan::plan_segments,
    readiness::wait_for_file,
    storage::{FsObjectStore, ObjectStore},
    transcript::clean::TranscriptCleaner,
    transcript::run::run_transcription,
    transform::Segment,
};

const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "mov", "avi"];
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Working name the cleaned transcript is written under before Finalize
/// renames it to the configured published name.
const TRANSCRIPT_WORKING_NAME: &str = "transcript.tmp.txt";

/// A non-fatal condition surfaced in the run summary. Every fallback the
/// pipeline takes shows up as exactly one of these; nothing is swallowed.
#[derive(Clone, Debug)]
pub enum RunWarning {
    ConversionFailed { input: PathBuf, detail: String },
    ConversionNotReady { path: PathBuf },
    SizeCeilingNotMet { path: PathBuf, byte_size: u64, ceiling: u64 },
    TranscriptionFailed { detail: String },
    NoTranscriptProduced,
    TranscriptNotReady { path: PathBuf },
    TranscriptRenameFailed { detail: String },
    CleanupFailed { path: PathBuf, detail: String },
    CompanionResizeFailed { detail: String },
    PublishFailed { key: String, detail: String },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConversionFailed { input, detail } => {
                write!(f, "conversion failed for '{}', kept original: {detail}", input.display())
            }
            Self::ConversionNotReady { path } => {
                write!(
                    f,
                    "converted file '{}' never became readable, kept original",
                    path.display()
                )
            }
            Self::SizeCeilingNotMet { path, byte_size, ceiling } => {
                write!(
                    f,
                    "artifact '{}' is {byte_size} bytes, over the {ceiling}-byte ceiling (best effort kept)",
                    path.display()
                )
            }
            Self::TranscriptionFailed { detail } => {
                write!(f, "transcription failed, skipping transcript: {detail}")
            }
            Self::NoTranscriptProduced => {
                write!(f, "transcription completed but produced no subtitle file")
            }
            Self::TranscriptNotReady { path } => {
                write!(
                    f,
                    "subtitle file '{}' never became readable, skipping transcript",
                    path.display()
                )
            }
            Self::TranscriptRenameFailed { detail } => {
                write!(f, "could not publish transcript under its final name: {detail}")
            }
            Self::CleanupFailed { path, detail } => {
                write!(f, "could not remove intermediate '{}': {detail}", path.display())
            }
            Self::CompanionResizeFailed { detail } => {
                write!(f, "companion image resize failed: {detail}")
            }
            Self::PublishFailed { key, detail } => {
                write!(f, "upload of '{key}' failed: {detail}")
            }
        }
    }
}

/// What one run produced, plus every fallback it took along the way.
#[derive(Debug)]
pub struct RunSummary {
    pub artifacts: Vec<ArtifactResult>,
    pub transcript: Option<PathBuf>,
    pub companion_image: Option<PathBuf>,
    pub warnings: Vec<RunWarning>,
}

/// Sequences Ingest -> Normalize -> Decode -> Split&Encode (parallel with
/// Transcribe&Clean) -> Finalize for one input directory. Constructed from an
/// explicit [`PipelineConfig`]; holds no global state.
pub struct PipelineCoordinator {
    config: PipelineConfig,
    store: Option<Box<dyn ObjectStore>>,
}

impl PipelineCoordinator {
    pub fn new(config: PipelineConfig) -> ClipstackResult<Self> {
        config.validate()?;
        let store: Option<Box<dyn ObjectStore>> = config
            .publish_root
            .as_ref()
            .map(|root| Box::new(FsObjectStore::new(root)) as Box<dyn ObjectStore>);
        Ok(Self { config, store })
    }

    /// Replace the publish target (e.g. a remote store instead of the
    /// filesystem one derived from the config).
    pub fn with_store(mut self, store: Box<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn run(&self) -> ClipstackResult<RunSummary> {
        let cfg = &self.config;
        std::fs::create_dir_all(&cfg.output_dir).map_err(|e| {
            ClipstackError::invalid_input(format!(
                "cannot create output directory '{}': {e}",
                cfg.output_dir.display()
            ))
        })?;

        let mut warnings = Vec::new();

        // Ingest: find the inputs and classify by probed duration, never by
        // filename. The longer video is the subject, the shorter one feeds
        // transcription.
        let (videos, images) = scan_inputs(cfg)?;
        let mut probed = Vec::with_capacity(videos.len());
        for path in videos {
            let info = VideoSource::probe(&path)?;
            probed.push((path, info.duration_sec));
        }
        let (subject_raw, transcript_source) = classify_videos(probed).ok_or_else(|| {
            ClipstackError::invalid_input(format!(
                "no video files found in '{}'",
                cfg.input_dir.display()
            ))
        })?;
        let companion_source = images.into_iter().next();
        tracing::info!(
            subject = %subject_raw.display(),
            transcript = ?transcript_source,
            "ingest classified inputs"
        );

        // Normalize: convert foreign containers, then require the converted
        // file to be readable before trusting it.
        let subject = match normalize_container(&subject_raw)? {
            ConversionOutcome::NotNeeded(path) => path,
            ConversionOutcome::Converted(path) => {
                if wait_for_file(&path, cfg.readiness_timeout) {
                    if let Err(e) = std::fs::remove_file(&subject_raw) {
                        warnings.push(RunWarning::CleanupFailed {
                            path: subject_raw.clone(),
                            detail: e.to_string(),
                        });
                    }
                    path
                } else {
                    warnings.push(RunWarning::ConversionNotReady { path });
                    subject_raw.clone()
                }
            }
            ConversionOutcome::Failed { original, detail } => {
                warnings.push(RunWarning::ConversionFailed {
                    input: original.clone(),
                    detail,
                });
                original
            }
        };

        // Decode: open the subject once; segments borrow this handle and are
        // all gone again by the time the encode branch returns.
        let source = VideoSource::probe(&subject)?;
        if source.duration_sec <= 0.0 {
            return Err(ClipstackError::media(format!(
                "'{}' reports no duration",
                subject.display()
            )));
        }

        // The two branches read disjoint inputs and write disjoint outputs,
        // so they run concurrently. Candidate encodes inside the encode
        // branch stay strictly sequential.
        let transcript_input = transcript_source.as_ref().unwrap_or(&subject).clone();
        let (encode_result, transcript_outcome) = rayon::join(
            || self.encode_branch(&source),
            || self.transcript_branch(&transcript_input),
        );

        let (first, second) = encode_result?;
        for artifact in [&first, &second] {
            if !artifact.meets_ceiling() {
                warnings.push(RunWarning::SizeCeilingNotMet {
                    path: artifact.path.clone(),
                    byte_size: artifact.byte_size,
                    ceiling: cfg.ceiling_bytes,
                });
            }
        }

        let TranscriptOutcome {
            cleaned,
            subtitle,
            warnings: transcript_warnings,
        } = transcript_outcome;
        warnings.extend(transcript_warnings);

        // Finalize: publish the transcript name, clear intermediates, resize
        // the companion to the first artifact's dimensions, then upload.
        let transcript = self.publish_transcript(cleaned, &mut warnings);
        if let Some(srt) = subtitle {
            if let Err(e) = std::fs::remove_file(&srt) {
                warnings.push(RunWarning::CleanupFailed {
                    path: srt,
                    detail: e.to_string(),
                });
            }
        }
        let companion_image =
            self.resize_companion(companion_source.as_deref(), &first, &mut warnings);

        if let Some(store) = &self.store {
            let mut uploads: Vec<&PathBuf> = vec![&first.path, &second.path];
            uploads.extend(transcript.as_ref());
            uploads.extend(companion_image.as_ref());
            for path in uploads {
                let key = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if let Err(e) = store.upload(path, &key) {
                    warnings.push(RunWarning::PublishFailed {
                        key,
                        detail: e.to_string(),
                    });
                }
            }
        }

        for w in &warnings {
            tracing::warn!(warning = %w, "non-fatal condition");
        }

        Ok(RunSummary {
            artifacts: vec![first, second],
            transcript,
            companion_image,
            warnings,
        })
    }

    fn encode_branch(
        &self,
        source: &VideoSource,
    ) -> ClipstackResult<(ArtifactResult, ArtifactResult)> {
        let cfg = &self.config;
        let intervals = plan_segments(source.duration_sec, cfg.segment_sec, cfg.tail_guard_sec)?;
        let base_width = (source.width / cfg.base_width_divisor).max(1);

        let fps = cfg.grid.fps();
        let mut rows = Vec::with_capacity(intervals.len());
        for interval in intervals {
            let segment = Segment::new(source, interval, cfg.speed, cfg.crop, base_width)?;
            rows.push(segment.render(fps)?);
        }

        let search = SizeFitSearch::new(cfg.grid.clone(), cfg.ceiling_bytes)?;
        let template = cfg.output_dir.join(&cfg.artifact_name);
        let mut encoder = FfmpegGifEncoder;
        encode_split(&rows, &template, &search, &mut encoder)
    }

    fn transcript_branch(&self, input: &std::path::Path) -> TranscriptOutcome {
        let cfg = &self.config;
        let mut outcome = TranscriptOutcome::default();
        let Some(transcriber) = &cfg.transcriber else {
            return outcome;
        };

        let subtitle = match run_transcription(transcriber, input, &cfg.output_dir) {
            Err(e) => {
                outcome.warnings.push(RunWarning::TranscriptionFailed {
                    detail: e.to_string(),
                });
                return outcome;
            }
            Ok(None) => {
                outcome.warnings.push(RunWarning::NoTranscriptProduced);
                return outcome;
            }
            Ok(Some(path)) => path,
        };

        // The tool is a separate process; its subtitle file may still be
        // flushing when it exits.
        if !wait_for_file(&subtitle, cfg.readiness_timeout) {
            outcome
                .warnings
                .push(RunWarning::TranscriptNotReady { path: subtitle.clone() });
            outcome.subtitle = Some(subtitle);
            return outcome;
        }

        let raw = match std::fs::read_to_string(&subtitle) {
            Ok(raw) => raw,
            Err(e) => {
                outcome.warnings.push(RunWarning::TranscriptionFailed {
                    detail: format!("could not read '{}': {e}", subtitle.display()),
                });
                outcome.subtitle = Some(subtitle);
                return outcome;
            }
        };

        let cleaned_text = TranscriptCleaner::new().clean(&raw);
        let working = cfg.output_dir.join(TRANSCRIPT_WORKING_NAME);
        match std::fs::write(&working, cleaned_text) {
            Ok(()) => outcome.cleaned = Some(working),
            Err(e) => outcome.warnings.push(RunWarning::TranscriptionFailed {
                detail: format!("could not write cleaned transcript: {e}"),
            }),
        }
        outcome.subtitle = Some(subtitle);
        outcome
    }

    fn publish_transcript(
        &self,
        cleaned: Option<PathBuf>,
        warnings: &mut Vec<RunWarning>,
    ) -> Option<PathBuf> {
        let working = cleaned?;
        let published = self
            .config
            .output_dir
            .join(&self.config.published_transcript_name);
        if working == published {
            return Some(published);
        }
        if !wait_for_file(&working, self.config.readiness_timeout) {
            warnings.push(RunWarning::TranscriptNotReady {
                path: working.clone(),
            });
            return Some(working);
        }
        match std::fs::rename(&working, &published) {
            Ok(()) => Some(published),
            Err(e) => {
                // Keep the working copy rather than lose the content.
                warnings.push(RunWarning::TranscriptRenameFailed {
                    detail: e.to_string(),
                });
                Some(working)
            }
        }
    }

    fn resize_companion(
        &self,
        companion: Option<&std::path::Path>,
        first_artifact: &ArtifactResult,
        warnings: &mut Vec<RunWarning>,
    ) -> Option<PathBuf> {
        let src = companion?;
        let file_name = src.file_name()?;
        let dest = self.config.output_dir.join(file_name);
        // Dimensions come from the artifact result, not from re-reading the
        // encoded file.
        let (w, h) = (first_artifact.width, first_artifact.height);
        let resized = image::open(src)
            .map(|img| img.resize_exact(w, h, image::imageops::FilterType::Lanczos3));
        match resized.and_then(|img| img.save(&dest)) {
            Ok(()) => Some(dest),
            Err(e) => {
                warnings.push(RunWarning::CompanionResizeFailed {
                    detail: e.to_string(),
                });
                None
            }
        }
    }
}

#[derive(Debug, Default)]
struct TranscriptOutcome {
    /// Cleaned paragraph written under the working name, ready to publish.
    cleaned: Option<PathBuf>,
    /// The intermediate subtitle file, removed during Finalize.
    subtitle: Option<PathBuf>,
    warnings: Vec<RunWarning>,
}

fn scan_inputs(cfg: &PipelineConfig) -> ClipstackResult<(Vec<PathBuf>, Vec<PathBuf>)> {
    let entries = std::fs::read_dir(&cfg.input_dir).map_err(|e| {
        ClipstackError::invalid_input(format!(
            "cannot read input directory '{}': {e}",
            cfg.input_dir.display()
        ))
    })?;

    let mut videos = Vec::new();
    let mut images = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            videos.push(path);
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            images.push(path);
        }
    }
    videos.sort();
    images.sort();
    Ok((videos, images))
}

/// Longest probed duration is the subject; with two or more videos the
/// shortest becomes the transcript source.
fn classify_videos(mut probed: Vec<(PathBuf, f64)>) -> Option<(PathBuf, Option<PathBuf>)> {
    if probed.is_empty() {
        return None;
    }
    probed.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    let subject = probed[0].0.clone();
    let transcript = if probed.len() >= 2 {
        probed.last().map(|p| p.0.clone())
    } else {
        None
    };
    Some((subject, transcript))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_prefers_duration_over_name() {
        let (subject, transcript) = classify_videos(vec![
            (PathBuf::from("a_first.mp4"), 12.0),
            (PathBuf::from("z_last.mp4"), 300.0),
        ])
        .unwrap();
        assert_eq!(subject, PathBuf::from("z_last.mp4"));
        assert_eq!(transcript, Some(PathBuf::from("a_first.mp4")));

        // Single video: subject only, no transcript source.
        let (subject, transcript) =
            classify_videos(vec![(PathBuf::from("only.mov"), 45.0)]).unwrap();
        assert_eq!(subject, PathBuf::from("only.mov"));
        assert_eq!(transcript, None);

        assert!(classify_videos(vec![]).is_none());
    }

    #[test]
    fn classification_breaks_duration_ties_by_path() {
        let (subject, transcript) = classify_videos(vec![
            (PathBuf::from("b.mp4"), 60.0),
            (PathBuf::from("a.mp4"), 60.0),
        ])
        .unwrap();
        assert_eq!(subject, PathBuf::from("a.mp4"));
        assert_eq!(transcript, Some(PathBuf::from("b.mp4")));
    }

    #[test]
    fn scan_filters_by_extension() {
        let tmp = tempfile::tempdir().unwrap();
        for name in [
            "one.mp4",
            "two.MOV",
            "cover.png",
            "notes.txt",
            "clip.avi",
            "photo.JPG",
        ] {
            std::fs::write(tmp.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(tmp.path().join("sub.mp4")).unwrap();

        let cfg = PipelineConfig::new(tmp.path(), tmp.path().join("out"));
        let (videos, images) = scan_inputs(&cfg).unwrap();

        let names = |paths: &[PathBuf]| {
            paths
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&videos), vec!["clip.avi", "one.mp4", "two.MOV"]);
        assert_eq!(names(&images), vec!["cover.png", "photo.JPG"]);
    }

    #[test]
    fn missing_input_dir_is_invalid_input() {
        let cfg = PipelineConfig::new("/definitely/not/here", "/tmp/out");
        assert!(matches!(
            scan_inputs(&cfg),
            Err(ClipstackError::InvalidInput(_))
        ));
    }

    #[test]
    fn warnings_render_distinguishable_messages() {
        let warnings = [
            RunWarning::ConversionFailed {
                input: PathBuf::from("a.mov"),
                detail: "x".into(),
            },
            RunWarning::ConversionNotReady {
                path: PathBuf::from("a.mp4"),
            },
            RunWarning::SizeCeilingNotMet {
                path: PathBuf::from("w1.gif"),
                byte_size: 11,
                ceiling: 10,
            },
            RunWarning::TranscriptionFailed { detail: "x".into() },
            RunWarning::NoTranscriptProduced,
            RunWarning::TranscriptNotReady {
                path: PathBuf::from("t.srt"),
            },
            RunWarning::TranscriptRenameFailed { detail: "x".into() },
            RunWarning::CleanupFailed {
                path: PathBuf::from("t.srt"),
                detail: "x".into(),
            },
            RunWarning::CompanionResizeFailed { detail: "x".into() },
            RunWarning::PublishFailed {
                key: "w1.gif".into(),
                detail: "x".into(),
            },
        ];
        let rendered: Vec<String> = warnings.iter().map(|w| w.to_string()).collect();
        for (i, a) in rendered.iter().enumerate() {
            assert!(!a.is_empty());
            for b in rendered.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn coordinator_rejects_invalid_config() {
        let mut cfg = PipelineConfig::new("in", "out");
        cfg.ceiling_bytes = 0;
        assert!(PipelineCoordinator::new(cfg).is_err());
    }
}
