use std::path::{Path, PathBuf};

use crate::error::{ClipstackError, ClipstackResult};

/// How to invoke the external speech-to-text tool. `{input}` and `{output}`
/// in the argument template expand to the media path and the directory the
/// tool should write its subtitle file into.
#[derive(Clone, Debug)]
pub struct TranscriberConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl TranscriberConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: vec![
                "-i".to_string(),
                "{input}".to_string(),
                "-od".to_string(),
                "{output}".to_string(),
            ],
        }
    }

    pub(crate) fn expanded_args(&self, input: &Path, output_dir: &Path) -> Vec<String> {
        self.args
            .iter()
            .map(|a| {
                a.replace("{input}", &input.to_string_lossy())
                    .replace("{output}", &output_dir.to_string_lossy())
            })
            .collect()
    }
}

/// Run the transcription tool and locate the subtitle file it produced.
///
/// The tool's contract is "write one `.srt` into the output directory";
/// `Ok(None)` means it completed but produced nothing, which the caller
/// reports as a warning and moves on from.
pub fn run_transcription(
    config: &TranscriberConfig,
    input: &Path,
    output_dir: &Path,
) -> ClipstackResult<Option<PathBuf>> {
    tracing::info!(
        program = %config.program.display(),
        input = %input.display(),
        "starting transcription"
    );

    let out = std::process::Command::new(&config.program)
        .args(config.expanded_args(input, output_dir))
        .output()
        .map_err(|e| {
            ClipstackError::transcription(format!(
                "failed to run '{}': {e}",
                config.program.display()
            ))
        })?;

    if !out.status.success() {
        return Err(ClipstackError::transcription(format!(
            "'{}' exited with {}: {}",
            config.program.display(),
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    Ok(find_subtitle(output_dir))
}

/// First `.srt` (lexicographic, for determinism) in `dir`, if any.
pub fn find_subtitle(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut subtitles: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("srt"))
        })
        .collect();
    subtitles.sort();
    subtitles.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arg_template_expands_both_placeholders() {
        let cfg = TranscriberConfig::new("whisper");
        let args = cfg.expanded_args(Path::new("/in/talk.mp4"), Path::new("/out"));
        assert_eq!(args, vec!["-i", "/in/talk.mp4", "-od", "/out"]);
    }

    #[test]
    fn find_subtitle_picks_the_first_srt() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(find_subtitle(tmp.path()), None);

        std::fs::write(tmp.path().join("notes.txt"), "x").unwrap();
        assert_eq!(find_subtitle(tmp.path()), None);

        std::fs::write(tmp.path().join("b.srt"), "x").unwrap();
        std::fs::write(tmp.path().join("a.SRT"), "x").unwrap();
        assert_eq!(find_subtitle(tmp.path()), Some(tmp.path().join("a.SRT")));
    }

    #[test]
    fn missing_program_is_a_transcription_error() {
        let cfg = TranscriberConfig::new("definitely-not-a-real-transcriber");
        let tmp = tempfile::tempdir().unwrap();
        let err = run_transcription(&cfg, Path::new("in.mp4"), tmp.path()).unwrap_err();
        assert!(matches!(err, ClipstackError::Transcription(_)));
    }
}
