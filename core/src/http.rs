//! Protocol facts shared by the request and response helpers.

/// Whether a response with this status code is allowed to carry a body.
///
/// Informational (1xx), `204 No Content` and `304 Not Modified` responses
/// never have one, so their body bytes are not worth decoding.
pub fn status_has_body(status: u16) -> bool {
    !matches!(status, 100..=199 | 204 | 304)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn informational_statuses_have_no_body() {
        assert!(!status_has_body(100));
        assert!(!status_has_body(101));
        assert!(!status_has_body(199));
    }

    #[test]
    fn no_content_and_not_modified_have_no_body() {
        assert!(!status_has_body(204));
        assert!(!status_has_body(304));
    }

    #[test]
    fn other_statuses_have_body() {
        for status in [200, 201, 202, 205, 301, 400, 404, 500] {
            assert!(status_has_body(status), "{status} should allow a body");
        }
    }
}
