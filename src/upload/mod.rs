//! File uploads
//!
//! Small files are sent in one request. Files of at least
//! `UploadOptions::min_slice_size` bytes use a sliced upload: a session is
//! negotiated, slices are sent sequentially with bounded retries, and a
//! `.cpt` checkpoint next to the source file records progress so an
//! interrupted upload can resume.
//!
//! ## Core Functions
//!
//! - [`upload_file()`] - Upload a local file to a remote path
//! - [`upload_into_dir()`] - Upload a local file into a remote directory
//! - [`upload_init()`] / [`upload_chunk()`] - Low-level session steps

pub mod checkpoint;
pub mod chunks;
pub mod file;
pub mod session;
pub mod types;

pub use checkpoint::{Checkpoint, CheckpointStore, FileFingerprint, CHECKPOINT_SUFFIX};
pub use chunks::{upload_chunk, with_retry};
#[cfg(feature = "tokio")]
pub use file::upload_file_async;
pub use file::{file_sha1, upload_file, upload_into_dir};
pub use session::upload_init;
pub use types::{
    ProgressCallback, UploadOptions, UploadProgress, UploadResult, UploadSession,
    DEFAULT_MIN_SLICE_SIZE, DEFAULT_SLICE_SIZE, DEFAULT_UPLOAD_RETRY,
};
