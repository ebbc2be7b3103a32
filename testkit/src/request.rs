//! Building synthetic requests for handler tests.
//!
//! # Design
//! A request starts from fixed defaults (`GET https://example.com`) and is
//! shaped by an ordered list of [`RequestOption`]s. Later options win for
//! method, URL and body; path and query maps are replaced wholesale; extra
//! headers accumulate. Problems are reported, never returned, and the caller
//! still gets a context back.

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderName, HeaderValue, Method},
};
use bytes::Bytes;
use serde::Serialize;
use testkit_core::{encode_query, flatten, path_bindings, HarnessError, ParamMap, Reporter};
use url::Url;

use crate::context::{PathParams, ResponseRecorder, TestContext};

/// URL used when no [`with_url`] option is given.
pub const DEFAULT_URL: &str = "https://example.com";

/// One change to the request being prepared.
#[derive(Debug, Clone)]
pub enum RequestOption {
    Method(Method),
    Url(String),
    /// Replaces the body. `None` clears it.
    Body {
        bytes: Option<Bytes>,
        content_type: Option<HeaderValue>,
    },
    Header(HeaderName, HeaderValue),
    PathParams(ParamMap),
    QueryParams(ParamMap),
}

pub fn with_method(method: Method) -> RequestOption {
    RequestOption::Method(method)
}

pub fn with_url(url: impl Into<String>) -> RequestOption {
    RequestOption::Url(url.into())
}

/// Raw body bytes, sent without a content type.
pub fn with_body(bytes: impl Into<Bytes>) -> RequestOption {
    RequestOption::Body {
        bytes: Some(bytes.into()),
        content_type: None,
    }
}

/// Serialize `value` as the JSON body.
///
/// A serialization failure is reported right away and the returned option
/// leaves the request without a body.
pub fn with_json_body<T: Serialize + ?Sized>(
    reporter: &dyn Reporter,
    value: &T,
) -> RequestOption {
    reporter.helper();
    match serde_json::to_vec(value) {
        Ok(bytes) => RequestOption::Body {
            bytes: Some(Bytes::from(bytes)),
            content_type: Some(HeaderValue::from_static("application/json")),
        },
        Err(error) => {
            reporter.report(HarnessError::Serialize(error.to_string()));
            RequestOption::Body {
                bytes: None,
                content_type: None,
            }
        }
    }
}

pub fn with_header(name: HeaderName, value: HeaderValue) -> RequestOption {
    RequestOption::Header(name, value)
}

/// Path parameters. Lists bind the same key once per element.
pub fn with_path_params(params: ParamMap) -> RequestOption {
    RequestOption::PathParams(params)
}

/// Query parameters. Nested maps become bracket-notation keys.
pub fn with_query_params(params: ParamMap) -> RequestOption {
    RequestOption::QueryParams(params)
}

#[derive(Debug)]
struct RequestConfig {
    method: Method,
    url: String,
    body: Option<Bytes>,
    content_type: Option<HeaderValue>,
    headers: Vec<(HeaderName, HeaderValue)>,
    path_params: ParamMap,
    query_params: ParamMap,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            method: Method::GET,
            url: DEFAULT_URL.to_string(),
            body: None,
            content_type: None,
            headers: Vec::new(),
            path_params: ParamMap::new(),
            query_params: ParamMap::new(),
        }
    }
}

impl RequestConfig {
    fn apply(&mut self, option: RequestOption) {
        match option {
            RequestOption::Method(method) => self.method = method,
            RequestOption::Url(url) => self.url = url,
            RequestOption::Body {
                bytes,
                content_type,
            } => {
                self.body = bytes;
                self.content_type = content_type;
            }
            RequestOption::Header(name, value) => self.headers.push((name, value)),
            RequestOption::PathParams(params) => self.path_params = params,
            RequestOption::QueryParams(params) => self.query_params = params,
        }
    }
}

/// Prepare a request for a handler test.
///
/// Returns the context to hand to the handler and an empty recorder for its
/// response. If the URL or request cannot be built, the failure is
/// reported and a default context comes back; check the reporter before
/// trusting it.
pub fn prepare_request(
    reporter: &dyn Reporter,
    options: impl IntoIterator<Item = RequestOption>,
) -> (TestContext, ResponseRecorder) {
    reporter.helper();

    let mut config = RequestConfig::default();
    for option in options {
        config.apply(option);
    }

    // Path-only targets such as `/notes/1?x=1` are taken relative to the
    // default origin.
    let parsed = if config.url.starts_with('/') {
        Url::parse(DEFAULT_URL).and_then(|base| base.join(&config.url))
    } else {
        Url::parse(&config.url)
    };
    let mut url = match parsed {
        Ok(url) => url,
        Err(error) => {
            reporter.report(HarnessError::InvalidUrl {
                url: config.url,
                reason: error.to_string(),
            });
            return (TestContext::default(), ResponseRecorder::default());
        }
    };

    let query = encode_query(&flatten(&config.query_params, ""));
    if !query.is_empty() {
        let combined = match url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{query}"),
            _ => query,
        };
        url.set_query(Some(&combined));
    }

    let mut builder = Request::builder().method(config.method).uri(url.as_str());
    if let Some(content_type) = config.content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    for (name, value) in config.headers {
        builder = builder.header(name, value);
    }
    let body = config.body.map_or_else(Body::empty, Body::from);

    let request = match builder.body(body) {
        Ok(request) => request,
        Err(error) => {
            reporter.report(HarnessError::InvalidRequest(error.to_string()));
            return (TestContext::default(), ResponseRecorder::default());
        }
    };

    let params = PathParams::from(path_bindings(&config.path_params));
    tracing::debug!(
        method = %request.method(),
        uri = %request.uri(),
        path_params = params.len(),
        "prepared test request"
    );

    (TestContext::new(request, params), ResponseRecorder::default())
}
