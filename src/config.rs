//! Extraction configuration.
//!
//! [`ExtractOptions`] is a builder that carries the output layout, the frame
//! limit, and the injected diagnostics and progress observers into
//! [`FrameExtractor`](crate::FrameExtractor).
//!
//! # Example
//!
//! ```no_run
//! use framedump::{ExtractOptions, FrameExtractor};
//!
//! let options = ExtractOptions::new()
//!     .with_output_directory("stills")
//!     .with_file_prefix("shot")
//!     .with_frame_limit(24);
//!
//! let report = FrameExtractor::new(options).run("input.mp4")?;
//! println!("{} frames written", report.frames_written);
//! # Ok::<(), framedump::FrameDumpError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    diagnostics::{DiagnosticSink, Diagnostics},
    progress::{NoOpProgress, ProgressCallback},
};

/// Directory frames are written to when none is configured.
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "output";

/// File name prefix used when none is configured.
pub const DEFAULT_FILE_PREFIX: &str = "frame";

/// Default frame limit.
///
/// The stop check runs after the counter is incremented and compares with
/// `>`, so a run writes `limit + 1` frames when the stream has enough.
pub const DEFAULT_FRAME_LIMIT: u64 = 10;

/// Configuration for one extraction run.
#[derive(Clone)]
pub struct ExtractOptions {
    pub(crate) output_directory: PathBuf,
    pub(crate) file_prefix: String,
    pub(crate) frame_limit: u64,
    pub(crate) overwrite: bool,
    pub(crate) flush_decoder: bool,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for ExtractOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractOptions")
            .field("output_directory", &self.output_directory)
            .field("file_prefix", &self.file_prefix)
            .field("frame_limit", &self.frame_limit)
            .field("overwrite", &self.overwrite)
            .field("flush_decoder", &self.flush_decoder)
            .finish_non_exhaustive()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Create options with default settings.
    ///
    /// Defaults: `output/frame-N.png`, limit 10, no overwriting, decoder
    /// flushed at end of stream, diagnostics forwarded to `log`, no progress
    /// callback.
    pub fn new() -> Self {
        Self {
            output_directory: PathBuf::from(DEFAULT_OUTPUT_DIRECTORY),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            frame_limit: DEFAULT_FRAME_LIMIT,
            overwrite: false,
            flush_decoder: true,
            diagnostics: Diagnostics::default(),
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Set the directory images are written into.
    ///
    /// The directory must already exist.
    #[must_use]
    pub fn with_output_directory<P: AsRef<Path>>(mut self, directory: P) -> Self {
        self.output_directory = directory.as_ref().to_path_buf();
        self
    }

    /// Set the file name prefix (`<prefix>-<n>.png`).
    #[must_use]
    pub fn with_file_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Set the frame limit. See [`DEFAULT_FRAME_LIMIT`] for the stop rule.
    #[must_use]
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = limit;
        self
    }

    /// Allow existing output files to be replaced.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Control whether delayed frames are drained from the decoder once the
    /// container runs out of packets. Defaults to `true`.
    #[must_use]
    pub fn with_flush_decoder(mut self, flush: bool) -> Self {
        self.flush_decoder = flush;
        self
    }

    /// Route diagnostics to a custom sink.
    #[must_use]
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Diagnostics::new(sink);
        self
    }

    /// Attach a progress callback, invoked once per written frame.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn file_prefix(&self) -> &str {
        &self.file_prefix
    }

    pub fn frame_limit(&self) -> u64 {
        self.frame_limit
    }

    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    pub fn flush_decoder(&self) -> bool {
        self.flush_decoder
    }

    /// Path of the image for frame counter `frame_number`.
    pub fn output_path(&self, frame_number: u64) -> PathBuf {
        self.output_directory
            .join(format!("{}-{frame_number}.png", self.file_prefix))
    }

    /// Most frames a run can write with this limit.
    pub fn max_frames(&self) -> u64 {
        self.frame_limit.saturating_add(1)
    }
}
