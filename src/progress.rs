//! Progress reporting.
//!
//! A [`ProgressCallback`] is told about every frame the extraction loop
//! writes. Callbacks observe the run but cannot halt it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framedump::{ExtractOptions, FrameExtractor, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("wrote {}", info.output_path.display());
//!     }
//! }
//!
//! let options = ExtractOptions::new().with_progress(Arc::new(PrintProgress));
//! FrameExtractor::new(options).run("input.mp4")?;
//! # Ok::<(), framedump::FrameDumpError>(())
//! ```

use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

/// A snapshot taken right after a frame was written.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Frames written so far, including this one.
    pub current: u64,
    /// Frames the run will write at most, when a limit applies.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Counter value that named the output file.
    pub frame_number: u64,
    /// Presentation timestamp of the frame, if the decoder supplied one.
    pub timestamp: Option<Duration>,
    /// File the frame was written to.
    pub output_path: PathBuf,
    /// Wall-clock time since the run started.
    pub elapsed: Duration,
}

/// Trait for receiving progress updates during extraction.
///
/// Implementations must be [`Send`] and [`Sync`] so they can be shared
/// through [`ExtractOptions`](crate::ExtractOptions).
pub trait ProgressCallback: Send + Sync {
    /// Called once per written frame.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks timing and fires the callback.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: Option<u64>,
    current: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: Option<u64>) -> Self {
        Self {
            callback,
            total,
            current: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one written frame.
    pub(crate) fn advance(&mut self, frame_number: u64, timestamp: Option<Duration>, output_path: PathBuf) {
        self.current += 1;

        let percentage = self
            .total
            .filter(|&total| total > 0)
            .map(|total| (self.current as f32 / total as f32 * 100.0).min(100.0));

        let info = ProgressInfo {
            current: self.current,
            total: self.total,
            percentage,
            frame_number,
            timestamp,
            output_path,
            elapsed: self.start_time.elapsed(),
        };

        self.callback.on_progress(&info);
    }
}
