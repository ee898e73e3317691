//! Upload validation and staging.
//!
//! An accepted upload is written to the configured upload directory under a
//! sanitised, UUID-prefixed name. The [`StagedUpload`] guard removes the file
//! when dropped, whichever way the request ends.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use axum::extract::multipart::Field;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use super::UploadError;

/// Whether `filename` has an extension from `allowed` (case-insensitive).
pub fn allowed_file(filename: &str, allowed: &[String]) -> bool {
    match filename.rsplit_once('.') {
        Some((_, extension)) => allowed
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(extension)),
        None => false,
    }
}

/// Reduce a client-supplied filename to a safe basename.
///
/// Non-ASCII characters are dropped, path separators and runs of whitespace
/// become `_`, anything outside `[A-Za-z0-9_.-]` is removed, and leading or
/// trailing `.`/`_` are trimmed. May return an empty string.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// A file in the upload directory that is deleted on drop.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
}

impl StagedUpload {
    /// Claim a unique path in `dir` for `client_name`. Nothing is written.
    pub fn reserve(dir: &Path, client_name: &str) -> Self {
        let name = match secure_filename(client_name) {
            name if name.is_empty() => "upload".to_string(),
            name => name,
        };
        Self {
            path: dir.join(format!("{}_{}", Uuid::new_v4(), name)),
        }
    }

    /// Stream a multipart field to a fresh staged file.
    pub async fn from_field(
        dir: &Path,
        client_name: &str,
        mut field: Field<'_>,
    ) -> Result<Self, UploadError> {
        let staged = Self::reserve(dir, client_name);
        let mut file = File::create(&staged.path).await?;

        let mut written: u64 = 0;
        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(path = %staged.path.display(), bytes = written, "upload staged");
        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "upload removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove upload"),
        }
    }
}
