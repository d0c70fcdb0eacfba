//! High-level file upload
//!
//! Small files go up in a single request. Larger files are cut into the
//! slices the server asks for and sent one after another; progress is
//! persisted in a checkpoint after every slice so a later call can resume.

use crate::client::{CosClient, SignScope};
use crate::error::{CosError, Result};
use crate::storage::crud::stat;
use crate::storage::types::{normalize_file, Resource};
use crate::transport::{FormPart, RequestBody};
use crate::upload::checkpoint::{Checkpoint, CheckpointStore, FileFingerprint};
use crate::upload::chunks::{upload_chunk, with_retry};
use crate::upload::session::upload_init;
use crate::upload::types::{UploadOptions, UploadProgress, UploadResult};
use bytesize::ByteSize;
use log::{debug, info, warn};
use sha1::{Digest, Sha1};
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::Instant;

/// Upload a local file to `destination` in `bucket`.
///
/// Files smaller than `options.min_slice_size` are sent whole; larger ones
/// use a resumable sliced upload.
///
/// # Errors
///
/// Returns an error if:
/// - The options or the destination are invalid
/// - The file doesn't exist or is not a regular file
/// - A request still fails after `options.upload_retry` attempts
/// - The size reported by the service does not match the local file
///
/// A failed sliced upload leaves its checkpoint behind; calling again with
/// the same file and destination resumes from the last committed slice.
pub fn upload_file(
    client: &CosClient,
    bucket: &str,
    destination: &str,
    file_path: impl AsRef<Path>,
    options: &UploadOptions,
) -> Result<UploadResult> {
    options.validate()?;
    let destination = normalize_file(destination)?;
    let file_path = file_path.as_ref();

    let metadata = fs::metadata(file_path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CosError::invalid_argument(
            "file_path",
            format!("File does not exist: {}", file_path.display()),
        ),
        _ => CosError::from(e),
    })?;

    if !metadata.is_file() {
        return Err(CosError::invalid_argument(
            "file_path",
            format!("Not a regular file: {}", file_path.display()),
        ));
    }

    let start_time = Instant::now();
    let file_size = metadata.len();

    let result = if file_size < options.min_slice_size {
        upload_entire(client, bucket, &destination, file_path, file_size, options)?
    } else {
        upload_sliced(client, bucket, &destination, file_path, options)?
    };

    Ok(result.duration_ms(start_time.elapsed().as_millis() as u64))
}

/// Upload a local file as `name` inside the directory `dir`.
///
/// Only directory resources can receive uploads; passing a file resource is
/// an `InvalidArgument` error.
pub fn upload_into_dir(
    client: &CosClient,
    bucket: &str,
    dir: &Resource,
    name: &str,
    file_path: impl AsRef<Path>,
    options: &UploadOptions,
) -> Result<UploadResult> {
    let destination = dir.child_path(name)?;
    upload_file(client, bucket, &destination, file_path, options)
}

/// Async version of [`upload_file`], run on the blocking thread pool
#[cfg(feature = "tokio")]
pub async fn upload_file_async(
    client: &CosClient,
    bucket: &str,
    destination: &str,
    file_path: impl Into<std::path::PathBuf>,
    options: UploadOptions,
) -> Result<UploadResult> {
    let client = client.clone();
    let bucket = bucket.to_string();
    let destination = destination.to_string();
    let file_path = file_path.into();

    tokio::task::spawn_blocking(move || {
        upload_file(&client, &bucket, &destination, &file_path, &options)
    })
    .await
    .map_err(|e| CosError::Io(std::io::Error::other(format!("upload task failed: {}", e))))?
}

fn upload_entire(
    client: &CosClient,
    bucket: &str,
    destination: &str,
    file_path: &Path,
    file_size: u64,
    options: &UploadOptions,
) -> Result<UploadResult> {
    let content = fs::read(file_path)?;
    let sha = hex::encode(Sha1::digest(&content));
    let insert_only = if options.insert_only { "1" } else { "0" };

    let data = with_retry("upload file", options.upload_retry, |attempt| {
        debug!("uploading {} whole (attempt {})", destination, attempt);
        let body = RequestBody::Multipart(vec![
            FormPart::text("op", "upload"),
            FormPart::text("sha", sha.as_str()),
            FormPart::text("biz_attr", options.biz_attr.clone().unwrap_or_default()),
            FormPart::text("insertOnly", insert_only),
            FormPart::bytes("filecontent", content.clone()),
        ]);
        client.post(bucket, destination, body, SignScope::Multiple)
    })?;

    let access_url = data
        .as_ref()
        .and_then(|d| d.get("access_url"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    info!(
        "uploaded {} ({}) to {}",
        file_path.display(),
        ByteSize::b(file_size),
        destination
    );
    Ok(UploadResult::new(destination, file_size).access_url(access_url))
}

fn upload_sliced(
    client: &CosClient,
    bucket: &str,
    destination: &str,
    file_path: &Path,
    options: &UploadOptions,
) -> Result<UploadResult> {
    let store = CheckpointStore::for_file(file_path);
    let fingerprint = FileFingerprint::of(file_path)?;

    let mut checkpoint = match store.load()? {
        Some(checkpoint) if checkpoint.destination == destination => {
            info!(
                "resuming upload of {} at offset {}/{}",
                file_path.display(),
                checkpoint.offset,
                checkpoint.file_size
            );
            checkpoint
        }
        Some(checkpoint) => {
            warn!(
                "checkpoint of {} targets {}, starting a new session",
                file_path.display(),
                checkpoint.destination
            );
            store.clear()?;
            open_session(client, bucket, destination, file_path, fingerprint, options, &store)?
        }
        None => open_session(client, bucket, destination, file_path, fingerprint, options, &store)?,
    };

    let file_size = checkpoint.file_size;
    let resumed_from = checkpoint.offset;
    let total_chunks = checkpoint.total_slices();

    let mut file = File::open(file_path)?;
    let mut buffer = Vec::new();
    let mut chunks = 0;

    while !checkpoint.is_complete() {
        let offset = checkpoint.offset;
        let len = checkpoint.next_slice_len();

        buffer.resize(len as usize, 0);
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buffer)?;

        let access_url = with_retry("upload chunk", options.upload_retry, |attempt| {
            debug!(
                "sending slice at offset {} ({} bytes, attempt {})",
                offset, len, attempt
            );
            upload_chunk(
                client,
                bucket,
                destination,
                &checkpoint.session_id,
                offset,
                &buffer,
            )
        })?;

        if access_url.is_some() {
            checkpoint.access_url = access_url;
        }
        checkpoint.offset = offset + len;
        store.save(&checkpoint)?;
        chunks += 1;

        options.notify(UploadProgress::new_chunked(
            checkpoint.offset,
            file_size,
            checkpoint.offset.div_ceil(checkpoint.slice_size),
            total_chunks,
        ));
    }

    let remote = stat(client, bucket, destination)?;
    if remote.filesize != Some(file_size) {
        return Err(CosError::server_error(
            200,
            -1,
            format!(
                "Remote size {} of {} does not match local size {}",
                remote
                    .filesize
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                destination,
                file_size
            ),
        ));
    }

    store.clear()?;
    info!(
        "uploaded {} ({}, {} slices) to {}",
        file_path.display(),
        ByteSize::b(file_size),
        chunks,
        destination
    );

    Ok(UploadResult::new(destination, file_size)
        .access_url(checkpoint.access_url.or(remote.access_url))
        .chunks(chunks)
        .resumed_from(resumed_from))
}

fn open_session(
    client: &CosClient,
    bucket: &str,
    destination: &str,
    file_path: &Path,
    fingerprint: FileFingerprint,
    options: &UploadOptions,
    store: &CheckpointStore,
) -> Result<Checkpoint> {
    let sha = file_sha1(file_path)?;

    let session = with_retry("open upload session", options.upload_retry, |_| {
        upload_init(client, bucket, destination, fingerprint.size, &sha, options)
    })?;

    let checkpoint = Checkpoint::new(destination, &session, fingerprint);
    store.save(&checkpoint)?;
    Ok(checkpoint)
}

/// SHA-1 (hex) of a file, streamed
pub fn file_sha1(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_sha1() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        fs::write(&path, b"abc").unwrap();

        assert_eq!(
            file_sha1(&path).unwrap(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_file_sha1_streams_large_input() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let content = vec![42u8; 100_000];
        fs::write(&path, &content).unwrap();

        assert_eq!(
            file_sha1(&path).unwrap(),
            hex::encode(Sha1::digest(&content))
        );
    }
}
