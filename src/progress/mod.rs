//! Progress reporting decoupled from terminal rendering
//!
//! Downloads and transcodes emit [`ProgressEvent`]s into a [`ProgressSink`].
//! A [`ProgressReporter`] hands out one sink per stage; the indicatif renderer
//! draws a bar per sink and [`SilentReporter`] drops everything.

use indicatif::{ProgressBar, ProgressStyle};
#[cfg(test)]
use std::sync::{Arc, Mutex};

/// Number of steps on a rendered bar
const BAR_STEPS: u64 = 100;

/// A progress update from a running stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressEvent {
    /// Completion in percent, 0.0 to 100.0
    Percent(f64),
    /// The stage finished successfully
    Finished,
    /// The stage stopped on an error
    Failed,
}

/// Consumer of progress events for a single stage
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);

    fn percent(&self, percent: f64) {
        self.emit(ProgressEvent::Percent(percent));
    }

    fn finish(&self) {
        self.emit(ProgressEvent::Finished);
    }

    fn fail(&self) {
        self.emit(ProgressEvent::Failed);
    }
}

/// Factory for per-stage sinks
pub trait ProgressReporter: Send + Sync {
    fn stage(&self, label: &str) -> Box<dyn ProgressSink>;
}

/// Renders each stage as an indicatif bar
#[derive(Debug, Default)]
pub struct TerminalReporter;

impl TerminalReporter {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for TerminalReporter {
    fn stage(&self, label: &str) -> Box<dyn ProgressSink> {
        let bar = ProgressBar::new(BAR_STEPS);
        let style = ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {percent}% {eta}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("= ");
        bar.set_style(style);
        bar.set_message(label.to_string());
        Box::new(BarSink { bar })
    }
}

struct BarSink {
    bar: ProgressBar,
}

impl ProgressSink for BarSink {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Percent(percent) => {
                self.bar.set_position(percent_to_steps(percent));
            }
            ProgressEvent::Finished => {
                self.bar.set_position(BAR_STEPS);
                self.bar.finish();
            }
            ProgressEvent::Failed => self.bar.abandon(),
        }
    }
}

/// Map a percentage onto bar steps, clamped to the bar length
pub fn percent_to_steps(percent: f64) -> u64 {
    if !percent.is_finite() {
        return 0;
    }
    percent.clamp(0.0, 100.0).round() as u64 * BAR_STEPS / 100
}

/// Drops every event; used with `--quiet`
#[derive(Debug, Default)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn stage(&self, _label: &str) -> Box<dyn ProgressSink> {
        Box::new(SilentSink)
    }
}

struct SilentSink;

impl ProgressSink for SilentSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Records every event per stage label, for assertions in tests
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<(String, ProgressEvent)>>>,
}

#[cfg(test)]
impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<(String, ProgressEvent)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Stage labels in the order they were opened
    pub fn stages(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for (label, _) in self.events() {
            if labels.last() != Some(&label) {
                labels.push(label);
            }
        }
        labels
    }
}

#[cfg(test)]
impl ProgressReporter for RecordingReporter {
    fn stage(&self, label: &str) -> Box<dyn ProgressSink> {
        Box::new(RecordingSink {
            label: label.to_string(),
            events: Arc::clone(&self.events),
        })
    }
}

#[cfg(test)]
struct RecordingSink {
    label: String,
    events: Arc<Mutex<Vec<(String, ProgressEvent)>>>,
}

#[cfg(test)]
impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push((self.label.clone(), event));
        }
    }
}
