use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::fs;

/// Recoverable failures on the attachment path. These must never crash a
/// send; they surface to the user instead.
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("failed to read attachment '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported attachment type '{0}', expected an image")]
    UnsupportedType(String),
    #[error("malformed inline image data")]
    MalformedDataUri,
    #[error("inline image payload is not valid base64")]
    Payload(#[from] base64::DecodeError),
}

/// A received attachment reconstructed into something saveable. Triggering
/// the actual save is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadArtifact {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Builds the self-describing inline form: `data:<mime>;base64,<payload>`.
pub fn encode_bytes(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Reads one user-selected image file and produces its inline data URI.
///
/// This is the only suspension point on the send path; callers must await
/// completion before emitting the message, so a send can never go out with a
/// stale or absent attachment while encoding is in flight.
pub async fn encode_file(path: &Path) -> Result<String, AttachmentError> {
    let mime = mime_for_extension(path)?;
    let bytes = fs::read(path)
        .await
        .map_err(|source| AttachmentError::Read {
            path: path.display().to_string(),
            source,
        })?;
    Ok(encode_bytes(&bytes, mime))
}

/// Reconstructs a downloadable artifact from a received inline image, named
/// deterministically from the message timestamp.
pub fn decode(image: &str, timestamp: DateTime<Utc>) -> Result<DownloadArtifact, AttachmentError> {
    let rest = image
        .strip_prefix("data:")
        .ok_or(AttachmentError::MalformedDataUri)?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or(AttachmentError::MalformedDataUri)?;
    if mime.is_empty() {
        return Err(AttachmentError::MalformedDataUri);
    }
    let bytes = STANDARD.decode(payload)?;
    Ok(DownloadArtifact {
        filename: format!(
            "image_{}.{}",
            timestamp.timestamp_millis(),
            extension_for_mime(mime)
        ),
        mime: mime.to_string(),
        bytes,
    })
}

fn mime_for_extension(path: &Path) -> Result<&'static str, AttachmentError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => Ok("image/png"),
        Some("jpg" | "jpeg") => Ok("image/jpeg"),
        Some("gif") => Ok("image/gif"),
        Some("webp") => Ok("image/webp"),
        other => Err(AttachmentError::UnsupportedType(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "png",
    }
}

#[cfg(test)]
#[path = "tests/attachment_tests.rs"]
mod tests;
