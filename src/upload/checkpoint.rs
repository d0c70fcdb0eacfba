//! Resume state of a sliced upload
//!
//! The checkpoint lives next to the source file (`<file>.cpt`). It is
//! written after every committed slice and removed once the service has
//! confirmed the upload, so an interrupted upload can pick up where it
//! stopped instead of re-sending finished slices.

use crate::error::Result;
use crate::upload::types::UploadSession;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub const CHECKPOINT_SUFFIX: &str = ".cpt";

/// Size and modification time of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileFingerprint {
    pub size: u64,
    /// Unix milliseconds
    pub mtime: i64,
}

impl FileFingerprint {
    pub fn of(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path)?;
        let mtime = metadata
            .modified()
            .map(|t| DateTime::<Utc>::from(t).timestamp_millis())
            .unwrap_or(0);

        Ok(Self {
            size: metadata.len(),
            mtime,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Remote path the session uploads to
    pub destination: String,
    pub session_id: String,
    /// Bytes committed so far
    pub offset: u64,
    pub slice_size: u64,
    #[serde(default)]
    pub access_url: Option<String>,
    pub file_size: u64,
    pub file_mtime: i64,
}

impl Checkpoint {
    pub fn new(
        destination: impl Into<String>,
        session: &UploadSession,
        fingerprint: FileFingerprint,
    ) -> Self {
        Self {
            destination: destination.into(),
            session_id: session.session_id.clone(),
            offset: session.offset.min(fingerprint.size),
            slice_size: session.slice_size,
            access_url: session.access_url.clone(),
            file_size: fingerprint.size,
            file_mtime: fingerprint.mtime,
        }
    }

    pub fn fingerprint(&self) -> FileFingerprint {
        FileFingerprint {
            size: self.file_size,
            mtime: self.file_mtime,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.offset >= self.file_size
    }

    /// Length of the slice starting at `offset`
    pub fn next_slice_len(&self) -> u64 {
        self.slice_size.min(self.file_size.saturating_sub(self.offset))
    }

    /// Number of slices the whole file is cut into
    pub fn total_slices(&self) -> u64 {
        if self.slice_size == 0 {
            0
        } else {
            self.file_size.div_ceil(self.slice_size)
        }
    }

    fn digest(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    checkpoint: Checkpoint,
    digest: String,
}

/// Reads and writes the checkpoint sidecar of one source file
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    source: PathBuf,
    path: PathBuf,
}

impl CheckpointStore {
    pub fn for_file(source: impl AsRef<Path>) -> Self {
        let source = source.as_ref().to_path_buf();
        let mut path = OsString::from(source.as_os_str());
        path.push(CHECKPOINT_SUFFIX);

        Self {
            source,
            path: PathBuf::from(path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved checkpoint, if it still describes the source file.
    ///
    /// Unreadable, tampered or stale sidecars are removed and reported as
    /// absent.
    pub fn load(&self) -> Result<Option<Checkpoint>> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let envelope: Envelope = match serde_json::from_slice(&content) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.discard(&format!("unreadable ({})", e))?;
                return Ok(None);
            }
        };

        let checkpoint = envelope.checkpoint;
        if checkpoint.digest()? != envelope.digest {
            self.discard("digest mismatch")?;
            return Ok(None);
        }

        if checkpoint.slice_size == 0 || checkpoint.offset > checkpoint.file_size {
            self.discard("inconsistent offsets")?;
            return Ok(None);
        }

        let current = FileFingerprint::of(&self.source)?;
        if checkpoint.fingerprint() != current {
            self.discard("source file changed")?;
            return Ok(None);
        }

        debug!(
            "loaded checkpoint {} at offset {}/{}",
            self.path.display(),
            checkpoint.offset,
            checkpoint.file_size
        );
        Ok(Some(checkpoint))
    }

    /// Atomically replace the sidecar with `checkpoint`
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let envelope = Envelope {
            digest: checkpoint.digest()?,
            checkpoint: checkpoint.clone(),
        };
        let bytes = serde_json::to_vec(&envelope)?;

        let mut tmp = OsString::from(self.path.as_os_str());
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let written = fs::File::create(&tmp).and_then(|mut file| {
            file.write_all(&bytes)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&tmp, &self.path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Remove the sidecar; a missing file is fine
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn discard(&self, reason: &str) -> Result<()> {
        warn!("discarding checkpoint {}: {}", self.path.display(), reason);
        self.clear()
    }
}
