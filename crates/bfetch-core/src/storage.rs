//! Destination file lifecycle.
//!
//! A download is streamed into `<destination>.part` and atomically renamed
//! into place once the transfer succeeded. Dropping an unfinalized writer
//! closes the handle and removes the temp file, so every exit path (HTTP
//! error, transport error, write error, cancellation) releases the file.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `file.h` → `file.h.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Creates missing parent directories of `path`. Idempotent.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Scoped writer for one destination file.
#[derive(Debug)]
pub struct StorageWriter {
    file: Option<File>,
    temp_path: PathBuf,
    final_path: PathBuf,
    written: u64,
}

impl StorageWriter {
    /// Ensure the parent directories of `final_path` exist and create (or truncate)
    /// the temp file next to it.
    pub fn create(final_path: &Path) -> io::Result<Self> {
        ensure_parent_dir(final_path)?;
        let temp_path = temp_path(final_path);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        Ok(StorageWriter {
            file: Some(file),
            temp_path,
            final_path: final_path.to_path_buf(),
            written: 0,
        })
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Sync, close, and atomically rename the temp file to the final path.
    /// Returns the number of bytes stored.
    pub fn finalize(mut self) -> io::Result<u64> {
        // On sync failure the file is still held, so Drop removes the temp file.
        if let Some(file) = self.file.as_ref() {
            file.sync_all()?;
        }
        drop(self.file.take());
        if let Err(e) = fs::rename(&self.temp_path, &self.final_path) {
            let _ = fs::remove_file(&self.temp_path);
            return Err(e);
        }
        Ok(self.written)
    }
}

impl Write for StorageWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "storage writer already closed"))?;
        let n = file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for StorageWriter {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
            if let Err(e) = fs::remove_file(&self.temp_path) {
                tracing::debug!(path = %self.temp_path.display(), "temp cleanup failed: {}", e);
            }
        }
    }
}
