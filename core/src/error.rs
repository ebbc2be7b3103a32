//! Failure types reported by the test kit.
//!
//! # Design
//! Nothing in the kit returns these as `Err`. Every failure is handed to a
//! [`Reporter`](crate::Reporter) and the test keeps running, so one scenario
//! can surface several independent problems. Sources are flattened to
//! strings to keep the type `Clone + PartialEq`, which lets recording
//! reporters hand out copies and tests compare them directly.

use std::time::Duration;

use thiserror::Error;

/// A single failure observed while preparing, sending, or checking a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    /// The configured target URL could not be parsed.
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A structured request body could not be serialized to JSON.
    #[error("failed to serialize request body: {0}")]
    Serialize(String),

    /// The parts were valid on their own but did not form an HTTP request.
    #[error("failed to build request: {0}")]
    InvalidRequest(String),

    /// `expect_called` was given no router to attach to.
    #[error("pipeline cannot be absent")]
    MissingPipeline,

    /// `expect_called` was given a router with no routes yet. Its layer
    /// would wrap nothing, so the watched route could never be counted.
    #[error("pipeline has no routes; add routes before expecting calls")]
    EmptyPipeline,

    #[error("status code {actual} is not {expected}")]
    StatusMismatch { expected: u16, actual: u16 },

    /// The response body stream failed before it was fully read.
    #[error("failed to read body of response: {0}")]
    BodyRead(String),

    /// The body was read but is not valid JSON for the requested type.
    #[error("failed to decode {body:?} into {target}: {reason}")]
    Decode {
        body: String,
        target: &'static str,
        reason: String,
    },

    /// A watched route was hit more often than expected.
    #[error("{path} hook asserts called {expected} times but called at least {actual} times")]
    OverCalled {
        path: String,
        expected: usize,
        actual: usize,
    },

    /// A bounded wait for a completion elapsed.
    #[error("expectation not completed within {0:?}")]
    Timeout(Duration),
}
