//! Test helpers for axum handlers.
//!
//! # Overview
//! - [`prepare_request`] synthesizes a request context from ordered options,
//!   flattening nested query parameters into bracket-notation keys.
//! - [`check_response`] asserts on a response's status and decodes its JSON
//!   body.
//! - [`expect_called`] watches a route on a [`Router`](axum::Router) and
//!   hands back a [`Completion`] that resolves once the route has been hit
//!   the expected number of times.
//!
//! Failures from every helper go to a caller-supplied
//! [`Reporter`]; none of them panic.
//!
//! # Example
//! ```ignore
//! let reporter = Arc::new(RecordingReporter::new());
//! let mut app = fixture_server::app();
//! let done = expect_called(&reporter, Some(&mut app), "/hello-world", [])
//!     .expect("router given");
//! // ... send traffic ...
//! assert!(ensure_completion(&*reporter, &done, [for_timeout(Duration::from_secs(5))]).await);
//! assert!(!reporter.failed());
//! ```

pub mod completion;
pub mod context;
pub mod expect;
pub mod request;
pub mod response;

pub use completion::Completion;
pub use context::{PathParams, ResponseRecorder, TestContext};
pub use expect::{
    ensure_completion, ensure_completion_blocking, expect_called, for_timeout, times_called,
    with_completion, EnsureOption, ExpectOption, DEFAULT_WAIT_TIMEOUT,
};
pub use request::{
    prepare_request, with_body, with_header, with_json_body, with_method, with_path_params,
    with_query_params, with_url, RequestOption, DEFAULT_URL,
};
pub use response::{check_response, check_status};
pub use testkit_core::{
    encode_query, flatten, path_bindings, status_has_body, FlatParam, HarnessError, ParamMap,
    ParamValue, RecordingReporter, Reporter,
};
