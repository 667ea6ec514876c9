//! File helpers shared by the pipelines and the generator.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use padx_core::{PadxError, PadxResult};

/// Size of `path`, which must be a regular file (symlinks are followed).
pub fn regular_file_len(path: &Path) -> PadxResult<u64> {
    let meta = std::fs::metadata(path).map_err(|e| with_path(e, "stat", path))?;
    if !meta.is_file() {
        return Err(PadxError::Usage(format!(
            "{} is not a regular file.",
            path.display()
        )));
    }
    Ok(meta.len())
}

pub(crate) fn open(path: &Path) -> PadxResult<File> {
    File::open(path).map_err(|e| with_path(e, "opening", path))
}

pub(crate) fn with_path(err: io::Error, action: &str, path: &Path) -> PadxError {
    PadxError::Io(io::Error::new(
        err.kind(),
        format!("{action} {}: {err}", path.display()),
    ))
}

/// An output file that only appears under its final name on [`commit`].
///
/// Bytes go to a temporary file in the destination directory. Dropping a
/// `PendingFile` without committing removes the temporary file, so a failed
/// run never leaves a partial output behind.
///
/// [`commit`]: PendingFile::commit
#[derive(Debug)]
pub struct PendingFile {
    tmp: NamedTempFile,
    target: PathBuf,
}

impl PendingFile {
    pub fn create(target: &Path) -> PadxResult<Self> {
        let dir = parent_dir(target);
        let tmp = tempfile::Builder::new()
            .prefix(".padx-")
            .suffix(".tmp")
            .tempfile_in(&dir)
            .map_err(|e| with_path(e, "creating temporary file in", &dir))?;
        Ok(Self {
            tmp,
            target: target.to_path_buf(),
        })
    }

    pub fn as_file_mut(&mut self) -> &mut File {
        self.tmp.as_file_mut()
    }

    /// Sync and move into place, replacing any existing file.
    pub fn commit(self) -> PadxResult<()> {
        self.tmp
            .as_file()
            .sync_all()
            .map_err(|e| with_path(e, "syncing", &self.target))?;
        self.tmp
            .persist(&self.target)
            .map_err(|e| with_path(e.error, "writing", &self.target))?;
        Ok(())
    }

    /// Sync and move into place, failing if the target already exists.
    pub fn commit_new(self) -> PadxResult<()> {
        self.tmp
            .as_file()
            .sync_all()
            .map_err(|e| with_path(e, "syncing", &self.target))?;
        self.tmp
            .persist_noclobber(&self.target)
            .map_err(|e| with_path(e.error, "writing", &self.target))?;
        Ok(())
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
