//! Mapping of GitHub HTTP responses onto [`PlatformError`].

use chrono::{DateTime, Utc};

use crate::http::{HttpError, HttpResponse};
use crate::platform::PlatformError;

/// Check a response's status and translate failures into platform errors.
///
/// `resource` names what was requested (usually `owner/repo`) and ends up
/// in [`PlatformError::NotFound`].
pub fn check_status(response: &HttpResponse, resource: &str) -> Result<(), PlatformError> {
    if response.is_success() {
        return Ok(());
    }

    match response.status {
        401 => Err(PlatformError::AuthRequired),
        404 => Err(PlatformError::not_found(resource)),
        403 | 429 if is_rate_limited(response) => Err(PlatformError::RateLimited {
            reset_at: rate_limit_reset(response),
        }),
        status => Err(PlatformError::api(format!(
            "HTTP {status}: {}",
            error_message(&response.body)
        ))),
    }
}

/// Whether the response signals an exhausted rate limit.
pub fn is_rate_limited(response: &HttpResponse) -> bool {
    response
        .header("x-ratelimit-remaining")
        .is_some_and(|v| v.trim() == "0")
}

fn rate_limit_reset(response: &HttpResponse) -> DateTime<Utc> {
    response
        .header("x-ratelimit-reset")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now)
}

/// Best-effort message from an error body: GitHub's `message` field or the raw text.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string())
}

impl From<HttpError> for PlatformError {
    fn from(err: HttpError) -> Self {
        PlatformError::network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, headers: &[(&str, &str)], body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_success_passes() {
        assert!(check_status(&response(200, &[], "[]"), "o/r").is_ok());
    }

    #[test]
    fn test_unauthorized_maps_to_auth_required() {
        let err = check_status(&response(401, &[], ""), "o/r").unwrap_err();
        assert!(matches!(err, PlatformError::AuthRequired));
    }

    #[test]
    fn test_not_found_names_resource() {
        let err = check_status(&response(404, &[], ""), "octo/missing").unwrap_err();
        match err {
            PlatformError::NotFound { resource } => assert_eq!(resource, "octo/missing"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_exhausted_quota_maps_to_rate_limited() {
        let resp = response(
            403,
            &[("X-RateLimit-Remaining", "0"), ("X-RateLimit-Reset", "1700000000")],
            "",
        );
        match check_status(&resp, "o/r").unwrap_err() {
            PlatformError::RateLimited { reset_at } => {
                assert_eq!(reset_at.timestamp(), 1_700_000_000);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let resp = response(429, &[("x-ratelimit-remaining", "0")], "");
        assert!(check_status(&resp, "o/r").unwrap_err().is_rate_limited());
    }

    #[test]
    fn test_forbidden_with_quota_left_is_api_error() {
        let resp = response(
            403,
            &[("x-ratelimit-remaining", "12")],
            r#"{"message":"Resource not accessible by integration"}"#,
        );
        match check_status(&resp, "o/r").unwrap_err() {
            PlatformError::Api { message } => {
                assert_eq!(message, "HTTP 403: Resource not accessible by integration");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_server_error_uses_raw_body() {
        match check_status(&response(502, &[], "bad gateway\n"), "o/r").unwrap_err() {
            PlatformError::Api { message } => assert_eq!(message, "HTTP 502: bad gateway"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
