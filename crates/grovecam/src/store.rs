//! Persisting captured pictures.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, info};

/// Directory pictures land in when none is given.
pub const DEFAULT_DIRECTORY: &str = "pictures";

/// File name prefix used when none is given.
pub const DEFAULT_PREFIX: &str = "GroveCamPic_";

/// Errors that can occur while storing a picture.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to create {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Somewhere to put finished pictures.
pub trait ImageStore {
    /// Persist `bytes` under a name derived from `suggested_name` and return
    /// where they went.
    fn save(&mut self, bytes: &[u8], suggested_name: &str) -> Result<PathBuf>;
}

/// Writes pictures into one directory as
/// `<prefix><yyyyMMddHHmmssSSS>.jpg`.
///
/// Bytes go to a hidden temporary file first and are renamed into place, so
/// a failed write never leaves a truncated picture behind.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save with an explicit timestamp.
    pub fn save_at(
        &mut self,
        bytes: &[u8],
        suggested_name: &str,
        at: OffsetDateTime,
    ) -> Result<PathBuf> {
        if !self.dir.exists() {
            debug!(dir = %self.dir.display(), "creating picture directory");
            fs::create_dir_all(&self.dir).map_err(|source| StoreError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;
        }

        let target = self.dir.join(file_name(suggested_name, at)?);
        let temp = self.dir.join(format!(
            ".{}.part",
            target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        ));

        if let Err(source) = write_file(&temp, bytes) {
            let _ = fs::remove_file(&temp);
            return Err(StoreError::Write { path: temp, source });
        }
        if let Err(source) = fs::rename(&temp, &target) {
            let _ = fs::remove_file(&temp);
            return Err(StoreError::Write {
                path: target,
                source,
            });
        }

        info!(path = %target.display(), bytes = bytes.len(), "picture saved");
        Ok(target)
    }
}

impl Default for DirectoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_DIRECTORY)
    }
}

impl ImageStore for DirectoryStore {
    fn save(&mut self, bytes: &[u8], suggested_name: &str) -> Result<PathBuf> {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        self.save_at(bytes, suggested_name, now)
    }
}

/// `<prefix><yyyyMMddHHmmssSSS>.jpg`
pub fn file_name(prefix: &str, at: OffsetDateTime) -> Result<String> {
    let stamp = at.format(format_description!(
        "[year][month][day][hour][minute][second][subsecond digits:3]"
    ))?;
    Ok(format!("{prefix}{stamp}.jpg"))
}

fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
