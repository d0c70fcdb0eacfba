//! Slice transfer and the retry policy shared by upload requests

use crate::client::{CosClient, SignScope};
use crate::error::{CosError, Result};
use crate::transport::{FormPart, RequestBody};
use log::warn;

/// Send one slice of an open session.
///
/// # Arguments
///
/// * `client` - The client used to sign and send the request
/// * `bucket` - Target bucket
/// * `destination` - Remote file path of the session
/// * `session_id` - The session id returned by `upload_init`
/// * `offset` - Position of `chunk` within the file
/// * `chunk` - The slice content
///
/// # Returns
///
/// The access URL when the service reports one (usually on the last slice)
pub fn upload_chunk(
    client: &CosClient,
    bucket: &str,
    destination: &str,
    session_id: &str,
    offset: u64,
    chunk: &[u8],
) -> Result<Option<String>> {
    if session_id.is_empty() {
        return Err(CosError::invalid_argument(
            "session_id",
            "Session ID cannot be empty",
        ));
    }

    if chunk.is_empty() {
        return Err(CosError::invalid_argument(
            "chunk",
            "Chunk cannot be empty",
        ));
    }

    let body = RequestBody::Multipart(vec![
        FormPart::text("op", "upload_slice"),
        FormPart::text("session", session_id),
        FormPart::text("offset", offset.to_string()),
        FormPart::bytes("filecontent", chunk.to_vec()),
    ]);

    let data = client.post(bucket, destination, body, SignScope::Multiple)?;
    Ok(data
        .as_ref()
        .and_then(|d| d.get("access_url"))
        .and_then(|v| v.as_str())
        .map(str::to_string))
}

/// Run `request` up to `attempts` times.
///
/// Server and transport failures are retried; anything else is returned at
/// once. When every attempt fails the caller gets a single `ServerError`.
pub fn with_retry<T, F>(operation: &str, attempts: u32, mut request: F) -> Result<T>
where
    F: FnMut(u32) -> Result<T>,
{
    let mut last_error = None;

    for attempt in 1..=attempts {
        match request(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => {
                warn!("{} failed (attempt {}/{}): {}", operation, attempt, attempts, e);
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(match last_error {
        Some(e @ CosError::ServerError { .. }) => e,
        Some(e) => CosError::server_error(
            0,
            -1,
            format!("{} failed after {} attempts: {}", operation, attempts, e),
        ),
        None => CosError::invalid_argument("upload_retry", "Upload retry must be greater than 0"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_succeeds_after_failures() {
        let mut calls = 0;
        let value = with_retry("op", 3, |attempt| {
            calls += 1;
            if attempt < 3 {
                Err(CosError::server_error(500, -1, "busy"))
            } else {
                Ok(attempt)
            }
        })
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_retry_exhaustion_keeps_server_error() {
        let mut calls = 0;
        let err = with_retry("op", 3, |_| -> Result<()> {
            calls += 1;
            Err(CosError::server_error(400, -999, "server error"))
        })
        .unwrap_err();

        assert_eq!(calls, 3);
        assert_eq!(err.server_code(), Some(-999));
    }

    #[test]
    fn test_retry_exhaustion_on_transport_becomes_server_error() {
        let err = with_retry("upload chunk", 2, |_| -> Result<()> {
            Err(CosError::transport_error("connection reset"))
        })
        .unwrap_err();

        match err {
            CosError::ServerError { status, code, message } => {
                assert_eq!((status, code), (0, -1));
                assert!(message.contains("upload chunk failed after 2 attempts"));
                assert!(message.contains("connection reset"));
            }
            other => panic!("Expected ServerError, got {:?}", other),
        }
    }

    #[test]
    fn test_non_retryable_error_stops_immediately() {
        let mut calls = 0;
        let err = with_retry("op", 5, |_| -> Result<()> {
            calls += 1;
            Err(CosError::invalid_argument("chunk", "empty"))
        })
        .unwrap_err();

        assert_eq!(calls, 1);
        assert!(matches!(err, CosError::InvalidArgument { .. }));
    }

    #[test]
    fn test_zero_attempts() {
        let err = with_retry("op", 0, |_| Ok(())).unwrap_err();
        assert!(matches!(err, CosError::InvalidArgument { .. }));
    }
}
