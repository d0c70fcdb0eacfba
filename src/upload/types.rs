use crate::error::{CosError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Files at or above this size are sliced (10 MiB)
pub const DEFAULT_MIN_SLICE_SIZE: u64 = 10 * 1024 * 1024;

/// Slice size proposed to the server (1 MiB)
pub const DEFAULT_SLICE_SIZE: u64 = 1024 * 1024;

/// Attempts per request before giving up
pub const DEFAULT_UPLOAD_RETRY: u32 = 3;

pub type ProgressCallback = Arc<dyn Fn(UploadProgress) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct UploadProgress {
    pub bytes_uploaded: u64,
    pub total_bytes: u64,
    pub percentage: f64,
    /// 1-based index of the slice just committed
    pub current_chunk: u64,
    pub total_chunks: u64,
}

impl UploadProgress {
    pub fn new(bytes_uploaded: u64, total_bytes: u64) -> Self {
        let percentage = if total_bytes > 0 {
            bytes_uploaded as f64 / total_bytes as f64
        } else {
            0.0
        };

        Self {
            bytes_uploaded,
            total_bytes,
            percentage: percentage.min(1.0),
            current_chunk: 0,
            total_chunks: 0,
        }
    }

    pub fn new_chunked(
        bytes_uploaded: u64,
        total_bytes: u64,
        current_chunk: u64,
        total_chunks: u64,
    ) -> Self {
        let mut progress = Self::new(bytes_uploaded, total_bytes);
        progress.current_chunk = current_chunk;
        progress.total_chunks = total_chunks;
        progress
    }
}

#[derive(Clone)]
pub struct UploadOptions {
    pub min_slice_size: u64,
    /// Advisory; the server decides the real slice size
    pub slice_size_hint: u64,
    /// Attempts per request, including the first
    pub upload_retry: u32,
    pub biz_attr: Option<String>,
    /// Refuse to overwrite an existing file (whole-file uploads)
    pub insert_only: bool,
    pub on_progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadOptions")
            .field("min_slice_size", &self.min_slice_size)
            .field("slice_size_hint", &self.slice_size_hint)
            .field("upload_retry", &self.upload_retry)
            .field("biz_attr", &self.biz_attr)
            .field("insert_only", &self.insert_only)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            min_slice_size: DEFAULT_MIN_SLICE_SIZE,
            slice_size_hint: DEFAULT_SLICE_SIZE,
            upload_retry: DEFAULT_UPLOAD_RETRY,
            biz_attr: None,
            insert_only: true,
            on_progress: None,
        }
    }
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_slice_size(mut self, size: u64) -> Self {
        self.min_slice_size = size;
        self
    }

    pub fn slice_size_hint(mut self, size: u64) -> Self {
        self.slice_size_hint = size;
        self
    }

    pub fn upload_retry(mut self, attempts: u32) -> Self {
        self.upload_retry = attempts;
        self
    }

    pub fn biz_attr(mut self, biz_attr: impl Into<String>) -> Self {
        self.biz_attr = Some(biz_attr.into());
        self
    }

    pub fn insert_only(mut self, insert_only: bool) -> Self {
        self.insert_only = insert_only;
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(UploadProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_slice_size == 0 {
            return Err(CosError::invalid_argument(
                "min_slice_size",
                "Minimum slice size must be greater than 0",
            ));
        }

        if self.slice_size_hint == 0 {
            return Err(CosError::invalid_argument(
                "slice_size_hint",
                "Slice size must be greater than 0",
            ));
        }

        if self.upload_retry == 0 {
            return Err(CosError::invalid_argument(
                "upload_retry",
                "Upload retry must be greater than 0",
            ));
        }

        Ok(())
    }

    pub(crate) fn notify(&self, progress: UploadProgress) {
        if let Some(ref callback) = self.on_progress {
            callback(progress);
        }
    }
}

/// Server-side context of a sliced upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSession {
    #[serde(rename = "session")]
    pub session_id: String,
    pub slice_size: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub access_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    /// Remote path of the uploaded file
    pub destination: String,
    pub access_url: Option<String>,
    pub size: u64,
    /// Slices sent by this call; 0 for a whole-file upload
    pub chunks: u64,
    /// Offset a resumed upload started from
    pub resumed_from: u64,
    pub duration_ms: u64,
}

impl UploadResult {
    pub fn new(destination: impl Into<String>, size: u64) -> Self {
        Self {
            destination: destination.into(),
            access_url: None,
            size,
            chunks: 0,
            resumed_from: 0,
            duration_ms: 0,
        }
    }

    pub fn access_url(mut self, access_url: Option<String>) -> Self {
        self.access_url = access_url;
        self
    }

    pub fn chunks(mut self, chunks: u64) -> Self {
        self.chunks = chunks;
        self
    }

    pub fn resumed_from(mut self, offset: u64) -> Self {
        self.resumed_from = offset;
        self
    }

    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}
