//! Profile picture storage.

use std::path::{Path, PathBuf};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use portfolio_shared::error::PortfolioError;
use portfolio_shared::intake::PortfolioCandidate;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

/// Everything but the unreserved URL characters gets escaped in a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Clone, Debug)]
pub struct AssetStore {
    upload_dir: PathBuf,
}

/// Keep only the final path component of a client supplied filename.
fn clean_filename(value: &str) -> &str {
    value.rsplit(['/', '\\']).next().unwrap_or_default()
}

/// `{first}_{last}_{original}`, reduced to a single path component.
pub fn asset_filename(first_name: &str, last_name: &str, original_filename: &str) -> String {
    format!(
        "{}_{}_{}",
        first_name.replace(['/', '\\', '\0'], "_"),
        last_name.replace(['/', '\\', '\0'], "_"),
        clean_filename(original_filename).replace('\0', "_")
    )
}

impl AssetStore {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub async fn ensure_dir(&self) -> Result<(), PortfolioError> {
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|err| {
                PortfolioError::Configuration(format!(
                    "Failed to create upload directory {}: {err}",
                    self.upload_dir.display()
                ))
            })
    }

    /// Write the candidate's picture, replacing any file of the same derived name.
    pub async fn save(&self, candidate: &PortfolioCandidate) -> Result<PathBuf, PortfolioError> {
        let upload = &candidate.profile_picture;
        let filename = asset_filename(&candidate.first_name, &candidate.last_name, &upload.filename);
        let path = self.upload_dir.join(&filename);

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            warn!("Overwriting existing profile picture {}", path.display());
        }

        let mut file = tokio::fs::File::create(&path).await.inspect_err(|err| {
            error!("Failed to create {}: {:?}", path.display(), err)
        })?;
        file.write_all(&upload.data).await?;
        file.flush().await?;

        debug!("Saved {} bytes to {}", upload.data.len(), path.display());
        Ok(path)
    }

    /// Map a stored picture reference back into the upload directory.
    pub fn resolve(&self, stored: &str) -> Option<PathBuf> {
        Path::new(stored)
            .file_name()
            .map(|name| self.upload_dir.join(name))
    }

    /// URL the view page uses for a stored picture reference.
    pub fn public_url(stored: &str) -> Option<String> {
        Path::new(stored)
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| format!("/static/uploads/{}", utf8_percent_encode(name, PATH_SEGMENT)))
    }
}
