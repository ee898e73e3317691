//! FFmpeg runtime setup and console verbosity.
//!
//! FFmpeg writes its own diagnostics to stderr independently of the Rust
//! [`log`](https://crates.io/crates/log) facade. Decoding user uploads tends
//! to trigger a lot of harmless warnings (missing timestamps, damaged
//! trailing packets), so callers usually want to turn it down.
//!
//! # Example
//!
//! ```no_run
//! use scenecut::FfmpegLogLevel;
//!
//! scenecut::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//! let changes = scenecut::scan_changes("input.mp4", 30.0)?;
//! # Ok::<(), scenecut::SceneCutError>(())
//! ```

use std::str::FromStr;

use ffmpeg_next::util::log::Level;
use thiserror::Error;

/// FFmpeg console verbosity, from quietest to noisiest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print nothing.
    Quiet,
    /// Only conditions that abort the process.
    Panic,
    /// Unrecoverable errors.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Verbose informational messages.
    Verbose,
    /// Debugging messages.
    Debug,
    /// Everything.
    Trace,
}

impl FfmpegLogLevel {
    fn as_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }
}

/// Error returned when parsing an unknown [`FfmpegLogLevel`] name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown FFmpeg log level: {0}")]
pub struct UnknownLogLevel(pub String);

impl FromStr for FfmpegLogLevel {
    type Err = UnknownLogLevel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "quiet" | "off" => Ok(FfmpegLogLevel::Quiet),
            "panic" => Ok(FfmpegLogLevel::Panic),
            "fatal" => Ok(FfmpegLogLevel::Fatal),
            "error" => Ok(FfmpegLogLevel::Error),
            "warning" | "warn" => Ok(FfmpegLogLevel::Warning),
            "info" => Ok(FfmpegLogLevel::Info),
            "verbose" => Ok(FfmpegLogLevel::Verbose),
            "debug" => Ok(FfmpegLogLevel::Debug),
            "trace" => Ok(FfmpegLogLevel::Trace),
            _ => Err(UnknownLogLevel(value.to_string())),
        }
    }
}

/// Set FFmpeg's console verbosity.
///
/// This does not affect records emitted through the `log` facade.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.as_level());
}

/// Initialise the FFmpeg libraries. Safe to call repeatedly.
pub(crate) fn initialize() -> Result<(), ffmpeg_next::Error> {
    ffmpeg_next::init()
}
