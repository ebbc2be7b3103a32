//! Call expectations on routed handlers, in-process and over real HTTP.
//!
//! # Design
//! In-process tests drive the router with `tower::ServiceExt::oneshot`.
//! Wire tests start the fixture server on a random port and send requests
//! with ureq from several threads at once, then wait on the completion with
//! a bounded timeout.

use std::{sync::Arc, thread, time::Duration};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use testkit::{
    ensure_completion, ensure_completion_blocking, expect_called, for_timeout, times_called,
    with_completion, Completion, HarnessError, RecordingReporter, Reporter,
};
use tower::ServiceExt;

const WAIT: Duration = Duration::from_secs(15);
const SHORT_WAIT: Duration = Duration::from_millis(200);

async fn hit(router: &Router, path: &str) -> StatusCode {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    router.clone().oneshot(request).await.unwrap().status()
}

fn watched(path: &str, times: usize) -> (Arc<RecordingReporter>, Router, Completion) {
    let reporter = Arc::new(RecordingReporter::new());
    let mut router = fixture_server::app();
    let completion =
        expect_called(&reporter, Some(&mut router), path, [times_called(times)]).unwrap();
    (reporter, router, completion)
}

// --- in-process ---

#[tokio::test]
async fn single_call_with_default_options_completes() {
    let reporter = Arc::new(RecordingReporter::new());
    let mut router = fixture_server::app();
    let completion = expect_called(&reporter, Some(&mut router), "/hello-world", []).unwrap();

    assert_eq!(hit(&router, "/hello-world").await, StatusCode::OK);

    assert!(ensure_completion(&*reporter, &completion, [for_timeout(WAIT)]).await);
    assert!(!reporter.failed());
}

#[tokio::test]
async fn zero_calls_never_complete() {
    let (reporter, router, completion) = watched("/hello-world", 1);

    assert_eq!(hit(&router, "/something-other-than-path").await, StatusCode::NOT_FOUND);

    assert!(!ensure_completion(&*reporter, &completion, [for_timeout(SHORT_WAIT)]).await);
    assert_eq!(reporter.errors(), vec![HarnessError::Timeout(SHORT_WAIT)]);
    assert_eq!(completion.remaining(), 1);
}

#[tokio::test]
async fn calling_too_often_reports_but_still_completes() {
    let (reporter, router, completion) = watched("/hello-world", 1);

    hit(&router, "/hello-world").await;
    hit(&router, "/hello-world").await;

    assert!(ensure_completion(&*reporter, &completion, [for_timeout(WAIT)]).await);
    assert_eq!(
        reporter.errors(),
        vec![HarnessError::OverCalled {
            path: "/hello-world".to_string(),
            expected: 1,
            actual: 2,
        }]
    );
}

#[tokio::test]
async fn composed_expectations_wait_for_every_route() {
    let reporter = Arc::new(RecordingReporter::new());
    let mut router = fixture_server::app();
    let completion =
        expect_called(&reporter, Some(&mut router), "/hello-world", [times_called(2)]).unwrap();
    let completion = expect_called(
        &reporter,
        Some(&mut router),
        "/other-path",
        [with_completion(&completion)],
    )
    .unwrap();

    hit(&router, "/hello-world").await;
    hit(&router, "/other-path").await;
    assert_eq!(completion.remaining(), 1);
    hit(&router, "/hello-world").await;

    assert!(ensure_completion(&*reporter, &completion, [for_timeout(WAIT)]).await);
    assert!(!reporter.failed());
}

#[tokio::test]
async fn route_patterns_match_exactly() {
    let (reporter, router, completion) = watched("/notes/{id}", 2);

    // Handler answers 404, but the route still matched.
    assert_eq!(hit(&router, "/notes/1").await, StatusCode::NOT_FOUND);
    assert_eq!(hit(&router, "/notes").await, StatusCode::OK);
    assert_eq!(completion.remaining(), 1);
    hit(&router, "/notes/2").await;

    assert!(ensure_completion(&*reporter, &completion, [for_timeout(WAIT)]).await);
    assert!(!reporter.failed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_are_counted_once_each() {
    let reporter = Arc::new(RecordingReporter::new());
    let mut router = fixture_server::app();
    let completion =
        expect_called(&reporter, Some(&mut router), "/hello-world", [times_called(20)]).unwrap();
    expect_called(
        &reporter,
        Some(&mut router),
        "/other-path",
        [times_called(5), with_completion(&completion)],
    )
    .unwrap();

    let mut tasks = Vec::new();
    for i in 0..25 {
        let router = router.clone();
        let path = if i % 5 == 0 { "/other-path" } else { "/hello-world" };
        tasks.push(tokio::spawn(async move { hit(&router, path).await }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }

    assert!(ensure_completion(&*reporter, &completion, [for_timeout(WAIT)]).await);
    assert!(!reporter.failed());
}

#[test]
fn missing_router_returns_none() {
    let reporter = Arc::new(RecordingReporter::new());

    let completion = expect_called::<_, ()>(&reporter, None, "", []);

    assert!(completion.is_none());
    assert!(reporter.failed());
}

#[test]
fn router_without_routes_returns_none() {
    let reporter = Arc::new(RecordingReporter::new());
    let mut router: Router = Router::new();

    assert!(expect_called(&reporter, Some(&mut router), "/hello-world", []).is_none());
    assert_eq!(reporter.errors(), vec![HarnessError::EmptyPipeline]);
}

#[tokio::test]
async fn routes_added_after_registration_are_not_counted() {
    let reporter = Arc::new(RecordingReporter::new());
    let mut router = Router::new().route("/first", axum::routing::get(|| async {}));
    let completion = expect_called(&reporter, Some(&mut router), "/late", []).unwrap();
    let router = router.route("/late", axum::routing::get(|| async {}));

    assert_eq!(hit(&router, "/late").await, StatusCode::OK);

    assert!(!ensure_completion(&*reporter, &completion, [for_timeout(SHORT_WAIT)]).await);
    assert_eq!(completion.remaining(), 1);
}

#[test]
fn works_with_a_dyn_reporter() {
    let reporter: Arc<dyn Reporter> = Arc::new(RecordingReporter::new());
    let mut router = fixture_server::app();
    assert!(expect_called(&reporter, Some(&mut router), "/hello-world", []).is_some());
}

// --- over the wire ---

fn get(addr: std::net::SocketAddr, path: &str) -> u16 {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();
    let response = agent
        .get(&format!("http://{addr}{path}"))
        .call()
        .expect("HTTP transport error");
    response.status().as_u16()
}

#[test]
fn wire_composed_expectations_complete_under_concurrency() {
    let reporter = Arc::new(RecordingReporter::new());
    let mut router = fixture_server::app();
    let completion =
        expect_called(&reporter, Some(&mut router), "/hello-world", [times_called(8)]).unwrap();
    expect_called(
        &reporter,
        Some(&mut router),
        "/other-path",
        [times_called(4), with_completion(&completion)],
    )
    .unwrap();
    let addr = fixture_server::spawn(router).unwrap();

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let path = if i % 3 == 0 { "/other-path" } else { "/hello-world" };
            thread::spawn(move || get(addr, path))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 200);
    }

    assert!(ensure_completion_blocking(&*reporter, &completion, [for_timeout(WAIT)]));
    assert!(!reporter.failed());
}

#[test]
fn wire_over_call_is_reported() {
    let (reporter, router, completion) = watched("/hello-world", 1);
    let addr = fixture_server::spawn(router).unwrap();

    assert_eq!(get(addr, "/hello-world"), 200);
    assert_eq!(get(addr, "/hello-world"), 200);

    assert!(completion.wait_timeout(WAIT));
    assert!(matches!(
        reporter.errors().as_slice(),
        [HarnessError::OverCalled { actual: 2, .. }]
    ));
}

#[test]
fn wire_unrelated_traffic_does_not_complete() {
    let (reporter, router, completion) = watched("/hello-world", 1);
    let addr = fixture_server::spawn(router).unwrap();

    assert_eq!(get(addr, "/other-path"), 200);

    assert!(!completion.wait_timeout(SHORT_WAIT));
    assert!(!reporter.failed());
}
