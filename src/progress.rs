// src/progress.rs

//! Progress reporting for clone transfers.
#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

/// Receives clone transfer progress, abstracting over `indicatif`.
///
/// # Examples
///
/// ```
/// use repocrawl::progress::ProgressReporter;
/// use std::sync::Mutex;
///
/// struct LastMessage(Mutex<String>);
///
/// impl ProgressReporter for LastMessage {
///     fn set_length(&self, _len: u64) {}
///     fn set_position(&self, _pos: u64) {}
///     fn set_message(&self, msg: String) {
///         *self.0.lock().unwrap() = msg;
///     }
///     fn finish_with_message(&self, msg: String) {
///         *self.0.lock().unwrap() = msg;
///     }
/// }
///
/// let reporter = LastMessage(Mutex::new(String::new()));
/// reporter.set_message("Receiving objects".to_string());
/// assert_eq!(*reporter.0.lock().unwrap(), "Receiving objects");
/// ```
pub trait ProgressReporter: Send + Sync {
    /// Sets the total number of objects to receive.
    fn set_length(&self, len: u64);
    fn set_position(&self, pos: u64);
    fn set_message(&self, msg: String);
    /// Finishes with a final message and hides the bar.
    fn finish_with_message(&self, msg: String);
}

/// A `ProgressReporter` that does nothing.
pub struct NoOpProgress;

impl ProgressReporter for NoOpProgress {
    fn set_length(&self, _len: u64) {}
    fn set_position(&self, _pos: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish_with_message(&self, _msg: String) {}
}

/// A progress bar on stderr, drawn with `indicatif`.
#[cfg(feature = "progress")]
#[derive(Clone)]
pub struct IndicatifProgress {
    bar: ProgressBar,
}

#[cfg(feature = "progress")]
impl IndicatifProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} objects {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self { bar }
    }
}

#[cfg(feature = "progress")]
impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "progress")]
impl ProgressReporter for IndicatifProgress {
    fn set_length(&self, len: u64) {
        self.bar.set_length(len);
    }

    fn set_position(&self, pos: u64) {
        self.bar.set_position(pos);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish_with_message(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Returns a progress bar when stderr is an interactive terminal, `None` otherwise.
pub fn terminal_progress() -> Option<Arc<dyn ProgressReporter>> {
    #[cfg(feature = "progress")]
    {
        if atty::is(atty::Stream::Stderr) {
            return Some(Arc::new(IndicatifProgress::new()));
        }
    }
    None
}
