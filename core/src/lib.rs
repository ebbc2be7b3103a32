//! Framework-independent pieces of the handler test kit.
//!
//! # Overview
//! Everything here is pure and I/O-free: nested parameter maps and their
//! flattening into bracket-notation query pairs, the status codes that carry
//! no body, and the [`Reporter`] trait all failures are routed through.
//! The `testkit` crate wires these into axum.
//!
//! # Design
//! - Failures are values ([`HarnessError`]) handed to a reporter, never
//!   panics or `Err` returns.
//! - [`ParamMap`] is ordered, so flattened output is deterministic.

pub mod error;
pub mod http;
pub mod params;
pub mod reporter;

pub use error::HarnessError;
pub use http::status_has_body;
pub use params::{encode_query, flatten, path_bindings, FlatParam, ParamMap, ParamValue};
pub use reporter::{RecordingReporter, Reporter};
