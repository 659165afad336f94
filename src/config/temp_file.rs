//! Scratch files that are removed when dropped.

use crate::config::Settings;
use crate::error::{FlowError, Result};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A uniquely named file under a directory, created empty and open.
///
/// The file is deleted on drop unless it was [persisted](TempFile::persist).
#[derive(Debug)]
pub struct TempFile {
    file: NamedTempFile,
}

impl TempFile {
    /// Create `<dir>/<prefix>-<random>.<extension>`.
    ///
    /// `extension` may be given with or without its leading dot.
    pub fn new_in(dir: impl AsRef<Path>, prefix: &str, extension: &str) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let extension = extension.trim_start_matches('.');

        let file = tempfile::Builder::new()
            .prefix(&format!("{}-", prefix))
            .suffix(&format!(".{}", extension))
            .tempfile_in(dir)?;
        tracing::trace!("Created temp file {:?}", file.path());
        Ok(Self { file })
    }

    /// Create a scratch file under the system temp directory.
    pub fn new(prefix: &str, extension: &str) -> Result<Self> {
        Self::new_in(std::env::temp_dir(), prefix, extension)
    }

    /// Create a scratch file under the configured data directory.
    pub fn in_data_dir(settings: &Settings, prefix: &str, extension: &str) -> Result<Self> {
        let dir = settings.resolved_data_dir().ok_or_else(|| {
            FlowError::Config("Could not determine data directory".to_string())
        })?;
        Self::new_in(dir.join("tmp"), prefix, extension)
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn read_to_string(&self) -> Result<String> {
        let mut contents = String::new();
        let mut file = self.file.reopen()?;
        file.read_to_string(&mut contents)?;
        Ok(contents)
    }

    /// Replace the file contents.
    pub fn write(&mut self, contents: impl AsRef<[u8]>) -> Result<()> {
        let file = self.file.as_file_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(contents.as_ref())?;
        file.flush()?;
        Ok(())
    }

    pub fn append(&mut self, contents: impl AsRef<[u8]>) -> Result<()> {
        let file = self.file.as_file_mut();
        file.seek(SeekFrom::End(0))?;
        file.write_all(contents.as_ref())?;
        file.flush()?;
        Ok(())
    }

    /// Move the file to `dest`, replacing anything there, and keep it.
    pub fn persist(self, dest: impl AsRef<Path>) -> Result<PathBuf> {
        let dest = dest.as_ref();
        self.file.persist(dest).map_err(|e| FlowError::Io(e.error))?;
        Ok(dest.to_path_buf())
    }
}
