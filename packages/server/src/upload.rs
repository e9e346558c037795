//! Multipart upload buffering.
//!
//! The analysis pipeline needs the whole file in memory, so the `file`
//! part of the form is read into a byte buffer up to a size cap. The file
//! name is checked before any of its bytes are read. Other parts are
//! drained and ignored.

use actix_multipart::{Multipart, MultipartError};
use crime_hotspots_dataset::{DatasetError, ensure_csv_file_name};
use futures::TryStreamExt as _;

/// Name of the form field carrying the CSV.
pub const FILE_FIELD: &str = "file";

/// An uploaded file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Client-supplied file name (empty if none was given).
    pub file_name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Errors that can occur while receiving an upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The multipart body could not be decoded.
    #[error("Failed to read upload: {0}")]
    Multipart(String),

    /// The form had no `file` part.
    #[error("No file was uploaded")]
    MissingFile,

    /// The uploaded file name does not end in `.csv`.
    #[error(transparent)]
    FileType(#[from] DatasetError),

    /// The file exceeded the configured size cap.
    #[error("Uploaded file exceeds the {limit} byte limit")]
    TooLarge {
        /// The configured cap in bytes.
        limit: usize,
    },
}

impl From<MultipartError> for UploadError {
    fn from(e: MultipartError) -> Self {
        Self::Multipart(e.to_string())
    }
}

/// Reads the `file` part of a multipart form into memory.
///
/// # Errors
///
/// Returns [`UploadError`] if the body is malformed, has no `file` part,
/// the file is not named `*.csv`, or the file is larger than `max_bytes`.
pub async fn read_upload(mut payload: Multipart, max_bytes: usize) -> Result<Upload, UploadError> {
    while let Some(mut field) = payload.try_next().await? {
        let disposition = field.content_disposition();
        let is_file = disposition.and_then(|cd| cd.get_name()) == Some(FILE_FIELD);
        let file_name = disposition
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_owned();

        if !is_file {
            while field.try_next().await?.is_some() {}
            continue;
        }

        ensure_csv_file_name(&file_name)?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(UploadError::TooLarge { limit: max_bytes });
            }
            bytes.extend_from_slice(&chunk);
        }

        log::debug!("Received upload {file_name:?} ({} bytes)", bytes.len());
        return Ok(Upload { file_name, bytes });
    }

    Err(UploadError::MissingFile)
}
