use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("work directory missing or not writable: {0}")]
    WorkDir(String),
    #[error("refusing to write outside the work directory: {0}")]
    OutsideWorkDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure the work directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::WorkDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::WorkDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::WorkDir(e.to_string()))?;
    }
    // Basic writability probe: try creating a temp file.
    NamedTempFile::new_in(dir).map_err(|e| PersistError::WorkDir(e.to_string()))?;
    Ok(())
}

/// Atomically writes generated files below one directory (temp file, then rename).
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `content` to `{dir}/{relative}`; `relative` may name subdirectories.
    pub fn write(&self, relative: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;
        let relative_path = checked_relative(relative)?;

        let target = self.dir.join(relative_path);
        let parent = target.parent().unwrap_or(&self.dir).to_path_buf();
        fs::create_dir_all(&parent)?;

        let mut tmp = NamedTempFile::new_in(&parent)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

fn checked_relative(relative: &str) -> Result<&Path, PersistError> {
    let path = Path::new(relative);
    let escapes = path.components().any(|component| {
        !matches!(component, Component::Normal(_) | Component::CurDir)
    });
    if relative.trim().is_empty() || escapes {
        return Err(PersistError::OutsideWorkDir(relative.to_string()));
    }
    Ok(path)
}
