//! Diagnostics plumbing.
//!
//! Pipeline components never call the `log` macros directly. They report
//! through a [`Diagnostics`] handle that wraps an injected
//! [`DiagnosticSink`], so a run can be silenced or captured in tests without
//! touching global logger state. [`LogSink`] is the default and forwards every
//! message to the [`log`](https://crates.io/crates/log) facade as a
//! `[stage] message` line.
//!
//! FFmpeg keeps its own logger, separate from the Rust side.
//! [`set_ffmpeg_log_level`] tunes how much of it reaches stderr.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framedump::{ExtractOptions, FfmpegLogLevel, SilentSink};
//!
//! framedump::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//! let options = ExtractOptions::new().with_diagnostics(Arc::new(SilentSink));
//! ```

use std::{
    fmt::{Arguments, Display, Formatter, Result as FmtResult},
    str::FromStr,
    sync::Arc,
};

use ffmpeg_next::util::log::Level as FfmpegLevel;
use log::Level;

/// The pipeline stage a diagnostic message comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Container opening, probing, and packet reading.
    Demuxer,
    /// Stream inspection and decoder resolution.
    Selector,
    /// Packet submission and frame reception.
    Decoder,
    /// Pixel format conversion.
    Converter,
    /// PNG output.
    Encoder,
    /// The extraction loop itself.
    Driver,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Stage::Demuxer => "demuxer",
            Stage::Selector => "selector",
            Stage::Decoder => "decoder",
            Stage::Converter => "converter",
            Stage::Encoder => "encoder",
            Stage::Driver => "driver",
        };
        f.write_str(name)
    }
}

/// One diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity.
    pub level: Level,
    /// Stage that produced the message.
    pub stage: Stage,
    /// Human-readable text, without the stage prefix.
    pub message: String,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

/// Receiver for pipeline diagnostics.
///
/// Implementations must be [`Send`] and [`Sync`] so a single sink can be
/// shared through [`ExtractOptions`](crate::ExtractOptions).
pub trait DiagnosticSink: Send + Sync {
    /// Called once per diagnostic message.
    fn record(&self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to the `log` facade under the `framedump` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn record(&self, diagnostic: &Diagnostic) {
        log::log!(target: "framedump", diagnostic.level, "{diagnostic}");
    }
}

/// Discards every diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSink;

impl DiagnosticSink for SilentSink {
    fn record(&self, _diagnostic: &Diagnostic) {}
}

/// Cloneable handle passed to each pipeline component.
#[derive(Clone)]
pub struct Diagnostics {
    sink: Arc<dyn DiagnosticSink>,
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Diagnostics").finish_non_exhaustive()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(Arc::new(LogSink))
    }
}

impl Diagnostics {
    /// Wrap a sink.
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink }
    }

    /// A handle that drops everything.
    pub fn silent() -> Self {
        Self::new(Arc::new(SilentSink))
    }

    /// Emit a message at an explicit level.
    pub fn emit(&self, level: Level, stage: Stage, message: Arguments<'_>) {
        self.sink.record(&Diagnostic {
            level,
            stage,
            message: message.to_string(),
        });
    }

    pub fn error(&self, stage: Stage, message: Arguments<'_>) {
        self.emit(Level::Error, stage, message);
    }

    pub fn warn(&self, stage: Stage, message: Arguments<'_>) {
        self.emit(Level::Warn, stage, message);
    }

    pub fn info(&self, stage: Stage, message: Arguments<'_>) {
        self.emit(Level::Info, stage, message);
    }

    pub fn debug(&self, stage: Stage, message: Arguments<'_>) {
        self.emit(Level::Debug, stage, message);
    }
}

/// FFmpeg internal log verbosity, from silent to most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    Quiet,
    Panic,
    Fatal,
    Error,
    Warning,
    Info,
    Verbose,
    Debug,
    Trace,
}

impl From<FfmpegLogLevel> for FfmpegLevel {
    fn from(level: FfmpegLogLevel) -> Self {
        match level {
            FfmpegLogLevel::Quiet => FfmpegLevel::Quiet,
            FfmpegLogLevel::Panic => FfmpegLevel::Panic,
            FfmpegLogLevel::Fatal => FfmpegLevel::Fatal,
            FfmpegLogLevel::Error => FfmpegLevel::Error,
            FfmpegLogLevel::Warning => FfmpegLevel::Warning,
            FfmpegLogLevel::Info => FfmpegLevel::Info,
            FfmpegLogLevel::Verbose => FfmpegLevel::Verbose,
            FfmpegLogLevel::Debug => FfmpegLevel::Debug,
            FfmpegLogLevel::Trace => FfmpegLevel::Trace,
        }
    }
}

impl FromStr for FfmpegLogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "quiet" => Ok(FfmpegLogLevel::Quiet),
            "panic" => Ok(FfmpegLogLevel::Panic),
            "fatal" => Ok(FfmpegLogLevel::Fatal),
            "error" => Ok(FfmpegLogLevel::Error),
            "warning" | "warn" => Ok(FfmpegLogLevel::Warning),
            "info" => Ok(FfmpegLogLevel::Info),
            "verbose" => Ok(FfmpegLogLevel::Verbose),
            "debug" => Ok(FfmpegLogLevel::Debug),
            "trace" => Ok(FfmpegLogLevel::Trace),
            other => Err(format!("unknown FFmpeg log level: {other}")),
        }
    }
}

/// Set FFmpeg's own log verbosity. Does not affect [`LogSink`] output.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(FfmpegLevel::from(level));
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Capture(Mutex<Vec<Diagnostic>>);

    impl DiagnosticSink for Capture {
        fn record(&self, diagnostic: &Diagnostic) {
            self.0.lock().unwrap().push(diagnostic.clone());
        }
    }

    #[test]
    fn diagnostics_reach_the_injected_sink() {
        let capture = Arc::new(Capture::default());
        let diagnostics = Diagnostics::new(capture.clone());

        diagnostics.warn(Stage::Converter, format_args!("format {} is odd", 7));
        diagnostics.debug(Stage::Driver, format_args!("tick"));

        let recorded = capture.0.lock().unwrap();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].level, Level::Warn);
        assert_eq!(recorded[0].to_string(), "[converter] format 7 is odd");
        assert_eq!(recorded[1].stage, Stage::Driver);
    }

    #[test]
    fn silent_handle_accepts_messages() {
        let diagnostics = Diagnostics::silent();
        diagnostics.error(Stage::Demuxer, format_args!("ignored"));
    }

    #[test]
    fn log_level_parsing() {
        assert_eq!("warn".parse::<FfmpegLogLevel>(), Ok(FfmpegLogLevel::Warning));
        assert_eq!("QUIET".parse::<FfmpegLogLevel>(), Ok(FfmpegLogLevel::Quiet));
        assert_eq!("trace".parse::<FfmpegLogLevel>(), Ok(FfmpegLogLevel::Trace));
        assert!("loud".parse::<FfmpegLogLevel>().is_err());
    }
}
