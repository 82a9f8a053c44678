//! Atomic placement of finished PDFs in the output directory.
//!
//! Bytes are first written to a hidden temporary file next to the target and
//! only renamed onto it once complete, so a failed conversion never leaves a
//! partial or empty file under the final name.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// A PDF being written, not yet visible under its final name.
pub struct StagedOutput {
    file: NamedTempFile,
    target: PathBuf,
}

impl StagedOutput {
    /// Create a staging file in the directory of `target`.
    pub fn create(target: impl Into<PathBuf>) -> std::io::Result<Self> {
        let target = target.into();
        let dir = match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file = tempfile::Builder::new()
            .prefix(".doc2pdf-")
            .suffix(".part")
            .tempfile_in(dir)?;
        Ok(Self { file, target })
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.file.write_all(bytes)
    }

    /// Flush and rename onto the target, replacing any existing file.
    pub fn commit(self) -> std::io::Result<PathBuf> {
        self.file.as_file().sync_all()?;
        self.file.persist(&self.target).map_err(|e| e.error)?;
        Ok(self.target)
    }
}

/// Write `bytes` to `target` atomically.
pub fn write_atomic(target: &Path, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let mut staged = StagedOutput::create(target)?;
    staged.write_all(bytes)?;
    staged.commit()
}
