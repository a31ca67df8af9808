//! Filesystem store for uploaded documents

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{Error, Result};

/// Directory of uploaded documents
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// Create a store rooted at `dir`; the directory is created on first save
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Upload directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` under the file-name component of `filename`.
    ///
    /// An existing upload with the same name is replaced.
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        self.stage(filename, bytes).await?.commit().await
    }

    /// Write `bytes` to a hidden staging file next to its final location.
    ///
    /// Nothing under the final name changes until [`StagedUpload::commit`].
    pub async fn stage(&self, filename: &str, bytes: &[u8]) -> Result<StagedUpload> {
        let name = sanitize_filename(filename)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let staged = self
            .dir
            .join(format!(".{}.{}{}", name, Uuid::new_v4().simple(), STAGING_SUFFIX));
        tokio::fs::write(&staged, bytes).await?;

        Ok(StagedUpload {
            name: name.to_string(),
            staged,
            target: self.dir.join(name),
        })
    }

    /// Names of stored uploads, sorted
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_file() && !is_staging_name(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete every upload, leaving an empty directory
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(&self.dir).await?;

        tracing::info!("Cleared uploads in {}", self.dir.display());
        Ok(())
    }
}

/// Upload written to disk but not yet visible under its name
#[derive(Debug)]
pub struct StagedUpload {
    name: String,
    staged: PathBuf,
    target: PathBuf,
}

impl StagedUpload {
    /// Sanitized file name the upload will be committed under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location of the staged bytes
    pub fn path(&self) -> &Path {
        &self.staged
    }

    /// Move the staged bytes to their final name, replacing any previous
    /// upload with that name
    pub async fn commit(self) -> Result<PathBuf> {
        if let Err(e) = tokio::fs::rename(&self.staged, &self.target).await {
            self.discard().await;
            return Err(e.into());
        }
        tracing::info!("Saved upload {}", self.target.display());
        Ok(self.target)
    }

    /// Delete the staged bytes
    pub async fn discard(self) {
        if let Err(e) = tokio::fs::remove_file(&self.staged).await {
            tracing::warn!("Failed to remove staged upload {}: {}", self.staged.display(), e);
        }
    }
}

const STAGING_SUFFIX: &str = ".part";

fn is_staging_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(STAGING_SUFFIX)
}

/// Last path component of a client-supplied file name
pub fn sanitize_filename(filename: &str) -> Result<&str> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::InvalidInput(format!("Invalid file name: {:?}", filename)));
    }
    Ok(name)
}
