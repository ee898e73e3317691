use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use scenecut::{
    AnalysisOptions, DEFAULT_THRESHOLD, FfmpegLogLevel, OperationType, Preview, PreviewOptions,
    PreviewStrategy, ProgressCallback, ProgressInfo, ScanOptions, VideoReader,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "server")]
use scenecut::server::ServerConfig;

const CLI_AFTER_HELP: &str = "Examples:\n  scenecut detect input.mp4 --threshold 25\n  scenecut previews input.mp4 --out previews --single-pass --progress\n  scenecut metadata input.mp4 --json\n  scenecut serve --config scenecut.toml\n  scenecut completions zsh > _scenecut";

#[derive(Debug, Parser)]
#[command(
    name = "scenecut",
    version,
    about = "Detect scene changes in video files and render captioned previews",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar while scanning and rendering.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<FfmpegLogLevel>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the frames where the picture changes abruptly.
    #[command(
        about = "Detect scene changes",
        after_help = "Examples:\n  scenecut detect input.mp4\n  scenecut detect input.mp4 --threshold 12.5 --json"
    )]
    Detect {
        /// Input video path.
        input: PathBuf,
        /// Mean grayscale difference (0-255) a frame must exceed to count as a change.
        #[arg(long, default_value_t = DEFAULT_THRESHOLD, value_parser = parse_threshold)]
        threshold: f64,
        /// Stop after reading this many frames.
        #[arg(long)]
        max_frames: Option<u64>,
        /// Output machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Detect scene changes and write one captioned PNG per change.
    #[command(
        about = "Render preview stills",
        after_help = "Examples:\n  scenecut previews input.mp4 --out previews\n  scenecut previews input.mp4 --out previews --max-dimension 640 --single-pass"
    )]
    Previews {
        /// Input video path.
        input: PathBuf,
        /// Output directory for preview images.
        #[arg(long)]
        out: PathBuf,
        /// Mean grayscale difference (0-255) a frame must exceed to count as a change.
        #[arg(long, default_value_t = DEFAULT_THRESHOLD, value_parser = parse_threshold)]
        threshold: f64,
        /// Stop after reading this many frames.
        #[arg(long)]
        max_frames: Option<u64>,
        /// Keep flagged frames in memory instead of seeking back for each one.
        #[arg(long)]
        single_pass: bool,
        /// Downscale frames so their longest edge is at most this many pixels.
        #[arg(long)]
        max_dimension: Option<u32>,
    },

    /// Print stream metadata.
    #[command(about = "Print video metadata", visible_alias = "probe")]
    Metadata {
        /// Input video path.
        input: PathBuf,
        /// Output metadata as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run the upload web front end.
    #[cfg(feature = "server")]
    #[command(
        about = "Serve the upload web interface",
        after_help = "Examples:\n  scenecut serve\n  scenecut serve --config scenecut.toml --bind 0.0.0.0:8080"
    )]
    Serve {
        /// TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Address to listen on (overrides the config file).
        #[arg(long)]
        bind: Option<String>,
        /// Directory for staged uploads (overrides the config file).
        #[arg(long)]
        upload_dir: Option<PathBuf>,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

impl Commands {
    /// Whether the command sets up its own log filter.
    fn configures_logging(&self) -> bool {
        #[cfg(feature = "server")]
        if matches!(self, Commands::Serve { .. }) {
            return true;
        }
        false
    }
}

fn parse_threshold(value: &str) -> Result<f64, String> {
    let threshold: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("not a number: {value}"))?;
    if threshold.is_finite() && threshold >= 0.0 {
        Ok(threshold)
    } else {
        Err(format!("must be a finite, non-negative number: {value}"))
    }
}

fn preview_file_name(frame_index: u64) -> String {
    format!("scene_change_{frame_index:06}.png")
}

fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn warn(message: impl AsRef<str>) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.as_ref().yellow());
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn Error>> {
    if path.exists() {
        if overwrite {
            warn(format!("overwriting {}", path.display()));
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn prepare_output_dir(out: &Path, overwrite: bool) -> Result<(), Box<dyn Error>> {
    if out.exists() {
        if !overwrite {
            return Err(format!(
                "output directory already exists: {} (use --overwrite)",
                out.display()
            )
            .into());
        }
        warn(format!("writing into existing directory {}", out.display()));
    }
    fs::create_dir_all(out)?;
    Ok(())
}

fn apply_global_options(global: &GlobalOptions) {
    if let Some(level) = global.log_level {
        scenecut::set_ffmpeg_log_level(level);
    }
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn Error>> {
        let bar = ProgressBar::new(0);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        let message = match info.operation {
            OperationType::SceneScan => format!("scanning, {} changes", info.changes_found),
            OperationType::PreviewRendering => "rendering previews".to_string(),
            _ => String::new(),
        };
        self.bar.set_message(message);
    }
}

fn terminal_progress(global: &GlobalOptions) -> Result<Option<Arc<TerminalProgress>>, Box<dyn Error>> {
    if global.progress {
        Ok(Some(Arc::new(TerminalProgress::new()?)))
    } else {
        Ok(None)
    }
}

fn scan_options(
    threshold: f64,
    max_frames: Option<u64>,
    progress: Option<&Arc<TerminalProgress>>,
) -> ScanOptions {
    let mut options = ScanOptions::new().with_threshold(threshold);
    if let Some(max_frames) = max_frames {
        options = options.with_max_frames(max_frames);
    }
    if let Some(progress) = progress {
        options = options.with_progress(progress.clone());
    }
    options
}

#[cfg(feature = "server")]
fn run_server(
    global: &GlobalOptions,
    config_path: Option<PathBuf>,
    bind: Option<String>,
    upload_dir: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let mut config = match config_path {
        Some(path) => ServerConfig::load(&path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = bind {
        config.bind_address = bind;
    }
    if let Some(upload_dir) = upload_dir {
        config.upload_dir = upload_dir;
    }

    let level = if global.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    init_logging(&level);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(scenecut::server::serve(config))?;
    Ok(())
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    if !cli.command.configures_logging() {
        init_logging(if cli.global.verbose { "debug" } else { "warn" });
    }
    apply_global_options(&cli.global);

    match cli.command {
        Commands::Detect {
            input,
            threshold,
            max_frames,
            json,
        } => {
            let progress = terminal_progress(&cli.global)?;
            let options = scan_options(threshold, max_frames, progress.as_ref());
            let changes = scenecut::scan_changes_with_options(&input, &options);
            if let Some(progress) = &progress {
                progress.finish();
            }
            let changes = changes?;

            if json {
                let payload = json!({
                    "input": input.display().to_string(),
                    "threshold": threshold,
                    "frames": changes.iter().map(|change| change.frame_index).collect::<Vec<_>>(),
                    "changes": changes,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else if changes.is_empty() {
                println!("no scene changes detected");
            } else {
                for change in &changes {
                    println!(
                        "scene change at frame {} ({:.2} s, score {:.1})",
                        change.frame_index, change.timestamp_seconds, change.score
                    );
                }
            }
        }
        Commands::Previews {
            input,
            out,
            threshold,
            max_frames,
            single_pass,
            max_dimension,
        } => {
            prepare_output_dir(&out, cli.global.overwrite)?;

            let progress = terminal_progress(&cli.global)?;
            let mut preview = PreviewOptions::new();
            if let Some(max_dimension) = max_dimension {
                preview = preview.with_max_dimension(max_dimension);
            }
            let strategy = if single_pass {
                PreviewStrategy::SinglePass
            } else {
                PreviewStrategy::Seek
            };
            let options = AnalysisOptions::new()
                .with_scan(scan_options(threshold, max_frames, progress.as_ref()))
                .with_preview(preview)
                .with_strategy(strategy);

            let report = scenecut::analyze(&input, &options);
            if let Some(progress) = &progress {
                progress.finish();
            }
            let report = report?;

            let mut written = 0_usize;
            for preview in &report.previews {
                match preview {
                    Preview::Rendered(image) => {
                        let path = out.join(preview_file_name(image.frame_index));
                        ensure_writable_path(&path, cli.global.overwrite)?;
                        fs::write(&path, &image.png)?;
                        written += 1;
                        if cli.global.verbose {
                            println!("{} {}", "saved".green().bold(), path.display());
                        }
                    }
                    Preview::Unavailable {
                        frame_index,
                        reason,
                        ..
                    } => warn(format!("no preview for frame {frame_index}: {reason}")),
                }
            }

            println!(
                "{} {} of {} previews to {}",
                "saved".green().bold(),
                written,
                report.changes.len(),
                out.display()
            );
        }
        Commands::Metadata { input, json } => {
            let reader = VideoReader::open(&input)?;
            let metadata = reader.metadata();
            if json {
                println!("{}", serde_json::to_string_pretty(metadata)?);
            } else {
                println!("Format: {}", metadata.format);
                println!("Duration: {:.3} s", metadata.duration.as_secs_f64());
                println!(
                    "Video: {}x{} @ {:.2} fps, ~{} frames [{}]",
                    metadata.width,
                    metadata.height,
                    metadata.frames_per_second,
                    metadata.frame_count,
                    metadata.codec,
                );
            }
        }
        #[cfg(feature = "server")]
        Commands::Serve {
            config,
            bind,
            upload_dir,
        } => run_server(&cli.global, config, bind, upload_dir)?,
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "scenecut", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Commands, parse_threshold, preview_file_name};

    #[test]
    fn parse_threshold_accepts_non_negative_numbers() {
        assert_eq!(parse_threshold("30"), Ok(30.0));
        assert_eq!(parse_threshold(" 12.5 "), Ok(12.5));
        assert_eq!(parse_threshold("0"), Ok(0.0));
        assert!(parse_threshold("-1").is_err());
        assert!(parse_threshold("NaN").is_err());
        assert!(parse_threshold("inf").is_err());
        assert!(parse_threshold("thirty").is_err());
    }

    #[test]
    fn preview_file_names_are_zero_padded() {
        assert_eq!(preview_file_name(42), "scene_change_000042.png");
    }

    #[test]
    fn detect_defaults_to_threshold_30() {
        let cli = Cli::try_parse_from(["scenecut", "detect", "input.mp4"]).unwrap();
        match cli.command {
            Commands::Detect {
                threshold,
                max_frames,
                json,
                ..
            } => {
                assert_eq!(threshold, 30.0);
                assert_eq!(max_frames, None);
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "scenecut",
            "previews",
            "input.mp4",
            "--out",
            "previews",
            "--single-pass",
            "--overwrite",
            "--log-level",
            "error",
        ])
        .unwrap();
        assert!(cli.global.overwrite);
        assert!(cli.global.log_level.is_some());
        assert!(matches!(
            cli.command,
            Commands::Previews {
                single_pass: true,
                ..
            }
        ));
    }

    #[test]
    fn rejects_negative_threshold() {
        assert!(Cli::try_parse_from(["scenecut", "detect", "in.mp4", "--threshold", "-5"]).is_err());
    }
}
