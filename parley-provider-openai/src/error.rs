//! Mapping of HTTP and transport failures to [`ProviderError`].

use std::time::Duration;

use parley::ProviderError;

/// Map a non-success HTTP status and its body.
///
/// Reference: <https://platform.openai.com/docs/guides/error-codes>
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    match status.as_u16() {
        400 => ProviderError::InvalidRequest(body.to_string()),
        401 | 403 => ProviderError::Authentication(body.to_string()),
        404 => ProviderError::ModelNotFound(body.to_string()),
        429 => ProviderError::RateLimit {
            retry_after: parse_retry_after(body),
        },
        500..=599 => ProviderError::ServiceUnavailable(body.to_string()),
        _ => ProviderError::InvalidRequest(format!("HTTP {status}: {body}")),
    }
}

/// Best-effort parse of "retry after N" out of an error body.
fn parse_retry_after(body: &str) -> Option<Duration> {
    let lower = body.to_lowercase();
    let idx = lower.find("retry after ")?;
    let secs: String = lower[idx + "retry after ".len()..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    secs.parse().ok().map(Duration::from_secs)
}

/// Map a transport error. `timeout` is the limit the request was sent with.
pub(crate) fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::Network(Box::new(err))
    }
}
