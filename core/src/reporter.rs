//! The failure sink every test-kit entry point reports through.
//!
//! # Design
//! Helpers never panic or return `Err`. They hand failures to a [`Reporter`]
//! passed in by the caller, and keep going with whatever partial result
//! they have. Reporters are shared with request handlers running on other
//! threads, so they must be `Send + Sync`.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::error::HarnessError;

/// Receives test failures.
pub trait Reporter: Send + Sync {
    /// Marks the calling frame as a helper. Most reporters ignore it.
    fn helper(&self) {}

    /// Report a free-form failure message.
    fn report_fmt(&self, args: fmt::Arguments<'_>);

    /// Report a structured failure. Defaults to its display text.
    fn report(&self, error: HarnessError) {
        self.report_fmt(format_args!("{error}"));
    }
}

/// A reporter that keeps every failure for later assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    errors: Mutex<Vec<HarnessError>>,
    messages: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether anything was reported.
    pub fn failed(&self) -> bool {
        self.failure_count() > 0
    }

    pub fn failure_count(&self) -> usize {
        lock(&self.errors).len() + lock(&self.messages).len()
    }

    /// Structured failures, in report order.
    pub fn errors(&self) -> Vec<HarnessError> {
        lock(&self.errors).clone()
    }

    /// Free-form failure messages, in report order.
    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }
}

impl Reporter for RecordingReporter {
    fn report_fmt(&self, args: fmt::Arguments<'_>) {
        let message = args.to_string();
        tracing::warn!(%message, "test failure reported");
        lock(&self.messages).push(message);
    }

    fn report(&self, error: HarnessError) {
        tracing::warn!(%error, "test failure reported");
        lock(&self.errors).push(error);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
