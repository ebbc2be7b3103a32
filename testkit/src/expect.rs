//! Expectations that a route is called a given number of times.
//!
//! # Design
//! [`expect_called`] wraps a router's routes in a middleware that, once the
//! handler has run, compares the request's [`MatchedPath`] to the watched
//! route. Each match takes a ticket from an atomic counter; tickets up to
//! the expected count signal the shared [`Completion`], later ones are
//! reported as over-calls. `Router::layer` only wraps routes that already
//! exist, so register expectations after adding the routes they watch.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    extract::{MatchedPath, Request},
    middleware::{self, Next},
    Router,
};
use testkit_core::{HarnessError, Reporter};

use crate::completion::Completion;

/// Timeout used by [`ensure_completion`] when none is given.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configures [`expect_called`].
#[derive(Debug, Clone)]
pub enum ExpectOption {
    /// Expected number of calls. Defaults to 1.
    Times(usize),
    /// Count into an existing completion instead of a fresh one.
    Completion(Completion),
}

pub fn times_called(times: usize) -> ExpectOption {
    ExpectOption::Times(times)
}

/// Share `completion` with this expectation, so one wait covers several
/// routes.
pub fn with_completion(completion: &Completion) -> ExpectOption {
    ExpectOption::Completion(completion.clone())
}

#[derive(Debug)]
struct ExpectConfig {
    times: usize,
    completion: Option<Completion>,
}

/// Counts calls to one watched route.
struct CallCounter<R: ?Sized> {
    path: String,
    times: usize,
    calls: AtomicUsize,
    completion: Completion,
    reporter: Arc<R>,
}

impl<R: Reporter + ?Sized> CallCounter<R> {
    fn observe(&self, matched: Option<&str>) {
        if matched != Some(self.path.as_str()) {
            return;
        }

        let call = self.calls.fetch_add(1, Ordering::AcqRel) + 1;
        if call <= self.times {
            tracing::debug!(
                path = %self.path,
                call,
                expected = self.times,
                "expected call observed"
            );
            self.completion.signal();
            return;
        }

        self.reporter.report(HarnessError::OverCalled {
            path: self.path.clone(),
            expected: self.times,
            actual: call,
        });
    }
}

/// Expect `path`, a route pattern such as `/notes/{id}`, to be called on
/// `pipeline`.
///
/// Returns the completion that resolves once every expected call has
/// landed, or `None` after reporting when no pipeline is given. Calls past
/// the expected count are reported and do not touch the completion.
///
/// Add the watched route to `pipeline` first: the counting layer only wraps
/// routes present at registration, so a route added afterwards is never
/// counted. A router with no routes at all is reported as
/// [`HarnessError::EmptyPipeline`] and yields `None`.
pub fn expect_called<R, S>(
    reporter: &Arc<R>,
    pipeline: Option<&mut Router<S>>,
    path: &str,
    options: impl IntoIterator<Item = ExpectOption>,
) -> Option<Completion>
where
    R: Reporter + ?Sized + 'static,
    S: Clone + Send + Sync + 'static,
{
    reporter.helper();

    let Some(router) = pipeline else {
        reporter.report(HarnessError::MissingPipeline);
        return None;
    };
    if !router.has_routes() {
        reporter.report(HarnessError::EmptyPipeline);
        return None;
    }

    let mut config = ExpectConfig {
        times: 1,
        completion: None,
    };
    for option in options {
        match option {
            ExpectOption::Times(times) => config.times = times,
            ExpectOption::Completion(completion) => config.completion = Some(completion),
        }
    }

    let completion = config.completion.unwrap_or_default();
    completion.add(config.times);

    let counter = Arc::new(CallCounter {
        path: path.to_string(),
        times: config.times,
        calls: AtomicUsize::new(0),
        completion: completion.clone(),
        reporter: Arc::clone(reporter),
    });

    let layer = middleware::from_fn(move |request: Request, next: Next| {
        let counter = Arc::clone(&counter);
        async move {
            let matched = request
                .extensions()
                .get::<MatchedPath>()
                .map(|p| p.as_str().to_string());
            let response = next.run(request).await;
            counter.observe(matched.as_deref());
            response
        }
    });

    *router = std::mem::take(router).layer(layer);
    tracing::debug!(%path, times = config.times, "registered call expectation");

    Some(completion)
}

/// Configures [`ensure_completion`].
#[derive(Debug, Clone)]
pub enum EnsureOption {
    Timeout(Duration),
}

pub fn for_timeout(timeout: Duration) -> EnsureOption {
    EnsureOption::Timeout(timeout)
}

fn wait_timeout(options: impl IntoIterator<Item = EnsureOption>) -> Duration {
    options
        .into_iter()
        .fold(DEFAULT_WAIT_TIMEOUT, |_, EnsureOption::Timeout(timeout)| timeout)
}

/// Wait for `completion` within a bounded time, reporting a timeout.
pub async fn ensure_completion(
    reporter: &dyn Reporter,
    completion: &Completion,
    options: impl IntoIterator<Item = EnsureOption>,
) -> bool {
    reporter.helper();
    let timeout = wait_timeout(options);
    match tokio::time::timeout(timeout, completion.wait_async()).await {
        Ok(()) => true,
        Err(_) => {
            reporter.report(HarnessError::Timeout(timeout));
            false
        }
    }
}

/// Blocking form of [`ensure_completion`] for synchronous tests.
pub fn ensure_completion_blocking(
    reporter: &dyn Reporter,
    completion: &Completion,
    options: impl IntoIterator<Item = EnsureOption>,
) -> bool {
    reporter.helper();
    let timeout = wait_timeout(options);
    if completion.wait_timeout(timeout) {
        return true;
    }
    reporter.report(HarnessError::Timeout(timeout));
    false
}
