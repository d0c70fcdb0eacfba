//! Upload session negotiation
//!
//! A sliced upload starts with an `upload_slice` request that carries the
//! file's size and SHA-1 but no content. The service answers with the
//! session id and the slice size it wants the client to use.

use crate::client::{CosClient, SignScope};
use crate::error::{CosError, Result};
use crate::transport::{FormPart, RequestBody};
use crate::upload::types::{UploadOptions, UploadSession};
use log::debug;

/// Open an upload session for `destination`.
///
/// # Arguments
///
/// * `client` - The client used to sign and send the request
/// * `bucket` - Target bucket
/// * `destination` - Remote file path
/// * `file_size` - Size of the whole source file
/// * `sha` - SHA-1 (hex) of the whole source file
/// * `options` - Provides the slice size hint and `biz_attr`
///
/// # Returns
///
/// The session as dictated by the server
pub fn upload_init(
    client: &CosClient,
    bucket: &str,
    destination: &str,
    file_size: u64,
    sha: &str,
    options: &UploadOptions,
) -> Result<UploadSession> {
    if destination.is_empty() || destination.ends_with('/') {
        return Err(CosError::invalid_argument(
            "destination",
            "Destination must be a file path",
        ));
    }

    let body = RequestBody::Multipart(vec![
        FormPart::text("op", "upload_slice"),
        FormPart::text("filesize", file_size.to_string()),
        FormPart::text("sha", sha),
        FormPart::text("slice_size", options.slice_size_hint.to_string()),
        FormPart::text("biz_attr", options.biz_attr.clone().unwrap_or_default()),
    ]);

    let data = client
        .post(bucket, destination, body, SignScope::Multiple)?
        .ok_or_else(|| CosError::server_error(200, -1, "Session response carries no data"))?;
    let session: UploadSession = serde_json::from_value(data)?;

    if session.session_id.is_empty() || session.slice_size == 0 {
        return Err(CosError::server_error(
            200,
            -1,
            format!(
                "Invalid session (id: '{}', slice size: {})",
                session.session_id, session.slice_size
            ),
        ));
    }

    debug!(
        "opened session {} for {} (slice size {}, offset {})",
        session.session_id, destination, session.slice_size, session.offset
    );
    Ok(session)
}
