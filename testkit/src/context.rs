//! The request context handed to handlers under test, and the sink that
//! captures what they return.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, RawPathParams, Request},
    handler::Handler,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use testkit_core::FlatParam;
use tower::ServiceExt;

/// Ordered path-parameter bindings. Keys may repeat.
///
/// Usable as an extractor: handlers get the bindings injected by
/// [`prepare_request`](crate::prepare_request) when present, and the
/// router's own captures otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<FlatParam>);

impl PathParams {
    /// First value bound to `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|p| p.key == key).map(|p| p.value.as_str())
    }

    /// Every value bound to `key`, in binding order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |p| p.key == key)
            .map(|p| p.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|p| (p.key.as_str(), p.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<FlatParam>> for PathParams {
    fn from(params: Vec<FlatParam>) -> Self {
        PathParams(params)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for PathParams {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(params) = parts.extensions.get::<PathParams>() {
            return Ok(params.clone());
        }
        let params = match RawPathParams::from_request_parts(parts, state).await {
            Ok(raw) => raw.iter().map(|(k, v)| FlatParam::new(k, v)).collect(),
            Err(_) => Vec::new(),
        };
        Ok(PathParams(params))
    }
}

/// A synthesized request plus the path parameters bound to it.
#[derive(Debug, Default)]
pub struct TestContext {
    request: Request,
    params: PathParams,
}

impl TestContext {
    pub(crate) fn new(request: Request, params: PathParams) -> Self {
        Self { request, params }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// The request with its path parameters attached as an extension.
    ///
    /// Without bindings nothing is attached, so a router's own captures
    /// stay visible to [`PathParams`].
    pub fn into_request(self) -> Request {
        let mut request = self.request;
        if !self.params.is_empty() {
            request.extensions_mut().insert(self.params);
        }
        request
    }

    /// Call `handler` directly, without routing, and record its response.
    pub async fn run<H, T>(self, handler: H, recorder: &mut ResponseRecorder)
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        let response = handler.call(self.into_request(), ()).await;
        recorder.record(response);
    }

    /// Send the request through `router` and record the response.
    pub async fn dispatch(self, router: Router, recorder: &mut ResponseRecorder) {
        let response = match router.oneshot(self.into_request()).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        recorder.record(response);
    }
}

/// Captures a handler's response.
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    response: Option<Response>,
}

impl ResponseRecorder {
    pub fn record(&mut self, response: impl IntoResponse) {
        let response = response.into_response();
        tracing::debug!(status = %response.status(), "recorded handler response");
        self.response = Some(response);
    }

    pub fn is_recorded(&self) -> bool {
        self.response.is_some()
    }

    /// Status of the recorded response; `200 OK` if nothing was recorded.
    pub fn status(&self) -> StatusCode {
        self.response.as_ref().map_or(StatusCode::OK, Response::status)
    }

    /// Take the recorded response, or an empty `200 OK` if there is none.
    pub fn result(&mut self) -> Response {
        self.response.take().unwrap_or_default()
    }
}
