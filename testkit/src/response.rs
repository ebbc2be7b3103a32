//! Status and body assertions on handler responses.

use std::fmt::Display;

use axum::{body::HttpBody, http::StatusCode, response::Response};
use http_body_util::BodyExt;
use serde::de::{DeserializeOwned, IgnoredAny};
use testkit_core::{status_has_body, HarnessError, Reporter};

/// Check `response` has the `expected` status and decode its JSON body into
/// `target`.
///
/// Pass `None` as the target when the body does not matter. Bodies of
/// statuses that cannot carry one (1xx, 204, 304) are never decoded. On a
/// decode failure `target` keeps its previous value. Every failure is
/// reported and turns the result to `false`.
pub async fn check_response<T, B>(
    reporter: &dyn Reporter,
    target: Option<&mut T>,
    expected: StatusCode,
    response: Response<B>,
) -> bool
where
    T: DeserializeOwned,
    B: HttpBody,
    B::Error: Display,
{
    reporter.helper();

    if response.status() != expected {
        reporter.report(HarnessError::StatusMismatch {
            expected: expected.as_u16(),
            actual: response.status().as_u16(),
        });
        return false;
    }

    let body = match response.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(error) => {
            reporter.report(HarnessError::BodyRead(error.to_string()));
            return false;
        }
    };

    let Some(target) = target else {
        return true;
    };
    if !status_has_body(expected.as_u16()) {
        return true;
    }

    match serde_json::from_slice::<T>(&body) {
        Ok(value) => {
            *target = value;
            true
        }
        Err(error) => {
            reporter.report(HarnessError::Decode {
                body: String::from_utf8_lossy(&body).into_owned(),
                target: std::any::type_name::<T>(),
                reason: error.to_string(),
            });
            false
        }
    }
}

/// [`check_response`] without a decode target.
pub async fn check_status<B>(
    reporter: &dyn Reporter,
    expected: StatusCode,
    response: Response<B>,
) -> bool
where
    B: HttpBody,
    B::Error: Display,
{
    check_response(reporter, None::<&mut IgnoredAny>, expected, response).await
}
