use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "clipstack", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline: segment, stack-encode under the size ceiling,
    /// and transcribe (requires `ffmpeg`/`ffprobe` on PATH).
    Run(RunArgs),
    /// Clean a subtitle file into a single plain-text paragraph.
    Clean(CleanArgs),
    /// Probe a video and print its stream facts as JSON.
    Probe(ProbeArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Directory holding the subject video (and optionally a transcript clip
    /// and a companion image).
    #[arg(long = "in")]
    input_dir: PathBuf,

    /// Directory the artifacts and transcript are written into.
    #[arg(long)]
    out: PathBuf,

    /// Artifact name template; the split inserts `1`/`2` before the extension.
    #[arg(long, default_value = "workout.gif")]
    artifact: String,

    /// Published name of the cleaned transcript.
    #[arg(long, default_value = "transcript.txt")]
    transcript: String,

    /// Segment length in seconds.
    #[arg(long, default_value_t = clipstack::config::DEFAULT_SEGMENT_SEC)]
    segment_sec: f64,

    /// Temporal speed-up factor.
    #[arg(long, default_value_t = clipstack::config::DEFAULT_SPEED)]
    speed: f64,

    /// Per-artifact byte ceiling.
    #[arg(long, default_value_t = clipstack::config::DEFAULT_CEILING_BYTES)]
    ceiling_bytes: u64,

    /// External transcription program; omit to skip the transcript branch.
    #[arg(long)]
    transcriber: Option<PathBuf>,

    /// Publish finished outputs into this store root.
    #[arg(long)]
    publish_root: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct CleanArgs {
    /// Input subtitle (SRT) file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output text file; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Video file to probe.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Clean(args) => cmd_clean(args),
        Command::Probe(args) => cmd_probe(args),
    }
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_env_var("CLIPSTACK_LOG")
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    if !clipstack::is_ffmpeg_on_path() || !clipstack::is_ffprobe_on_path() {
        anyhow::bail!("ffmpeg and ffprobe are required on PATH for `clipstack run`");
    }

    let mut config = clipstack::PipelineConfig::new(args.input_dir, args.out);
    config.artifact_name = args.artifact;
    config.published_transcript_name = args.transcript;
    config.segment_sec = args.segment_sec;
    config.speed = args.speed;
    config.ceiling_bytes = args.ceiling_bytes;
    config.transcriber = args
        .transcriber
        .map(clipstack::TranscriberConfig::new);
    config.publish_root = args.publish_root;

    let summary = clipstack::PipelineCoordinator::new(config)?.run()?;

    for artifact in &summary.artifacts {
        eprintln!(
            "wrote {} ({} bytes, {}x{}{})",
            artifact.path.display(),
            artifact.byte_size,
            artifact.width,
            artifact.height,
            if artifact.meets_ceiling() {
                ""
            } else {
                ", OVER CEILING"
            }
        );
    }
    if let Some(t) = &summary.transcript {
        eprintln!("wrote {}", t.display());
    }
    if let Some(img) = &summary.companion_image {
        eprintln!("wrote {}", img.display());
    }
    for warning in &summary.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}

fn cmd_clean(args: CleanArgs) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.in_path)
        .with_context(|| format!("read subtitle '{}'", args.in_path.display()))?;
    let cleaned = clipstack::TranscriptCleaner::new().clean(&raw);
    match args.out {
        Some(out) => {
            std::fs::write(&out, cleaned)
                .with_context(|| format!("write transcript '{}'", out.display()))?;
            eprintln!("wrote {}", out.display());
        }
        None => println!("{cleaned}"),
    }
    Ok(())
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let source = clipstack::VideoSource::probe(&args.in_path)?;
    let json = serde_json::json!({
        "path": source.path,
        "width": source.width,
        "height": source.height,
        "fps": source.source_fps(),
        "duration_sec": source.duration_sec,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
