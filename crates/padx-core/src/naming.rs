//! Pad and ciphertext naming rules
//!
//! Pad lifecycle on disk:
//! ```text
//! <S>.pads/<R>/<base>.w.pad  --encrypt-->  <S>.pads/<R>/<base>.x.pad
//! <R>.pads/<S>/<base>.r.pad  (matched read pad, identical bytes)
//! ```
//!
//! Only the final path component is inspected or rewritten, so directory
//! names containing `.enc` or `.w.pad` are left untouched.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::error::{PadxError, PadxResult};

/// Unused sender pad
pub const WRITE_PAD_EXT: &str = ".w.pad";

/// Consumed sender pad
pub const USED_PAD_EXT: &str = ".x.pad";

/// Recipient pad
pub const READ_PAD_EXT: &str = ".r.pad";

/// Encrypted container
pub const CIPHERTEXT_EXT: &str = ".enc";

/// Suffix of the per-peer pad directory
pub const PAD_DIR_EXT: &str = ".pads";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadState {
    Write,
    Used,
    Read,
}

impl PadState {
    pub fn ext(self) -> &'static str {
        match self {
            PadState::Write => WRITE_PAD_EXT,
            PadState::Used => USED_PAD_EXT,
            PadState::Read => READ_PAD_EXT,
        }
    }

    /// Classify a path by its pad suffix. A bare `.w.pad` with no stem is not a pad.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = file_name_str(path)?;
        [PadState::Write, PadState::Used, PadState::Read]
            .into_iter()
            .find(|state| has_strict_suffix(name, state.ext()))
    }
}

fn file_name_str(path: &Path) -> Option<&str> {
    path.file_name().and_then(OsStr::to_str)
}

fn has_strict_suffix(name: &str, suffix: &str) -> bool {
    name.len() > suffix.len() && name.ends_with(suffix)
}

fn replace_suffix(path: &Path, from: &str, to: &str) -> PadxResult<PathBuf> {
    let name = file_name_str(path)
        .filter(|n| has_strict_suffix(n, from))
        .ok_or_else(|| {
            PadxError::Usage(format!("{} does not end with `{from}`", path.display()))
        })?;
    let stem = &name[..name.len() - from.len()];
    Ok(path.with_file_name(format!("{stem}{to}")))
}

/// `<base>.w.pad` -> `<base>.x.pad`
pub fn consumed_name(write_pad: &Path) -> PadxResult<PathBuf> {
    replace_suffix(write_pad, WRITE_PAD_EXT, USED_PAD_EXT)
}

/// `report.pdf` -> `report.pdf.enc`
pub fn ciphertext_name(plaintext: &Path) -> PathBuf {
    let mut s = plaintext.as_os_str().to_os_string();
    s.push(CIPHERTEXT_EXT);
    PathBuf::from(s)
}

/// `report.pdf.enc` -> `report.pdf`
pub fn plaintext_name(ciphertext: &Path) -> PadxResult<PathBuf> {
    replace_suffix(ciphertext, CIPHERTEXT_EXT, "")
}

/// Base name for a generated pad pair: the nanosecond timestamp in lowercase hex.
pub fn timestamp_base(nanos: u128) -> String {
    format!("{nanos:x}")
}

/// Both ends of one directed channel `sender -> recipient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadPairPaths {
    pub write_pad: PathBuf,
    pub read_pad: PathBuf,
}

impl PadPairPaths {
    pub fn for_edge(root: &Path, sender: &str, recipient: &str, base: &str, dir_ext: &str) -> Self {
        Self {
            write_pad: Self::write_dir(root, sender, recipient, dir_ext)
                .join(format!("{base}{WRITE_PAD_EXT}")),
            read_pad: Self::read_dir(root, sender, recipient, dir_ext)
                .join(format!("{base}{READ_PAD_EXT}")),
        }
    }

    /// `<root>/<sender><ext>/<recipient>`
    pub fn write_dir(root: &Path, sender: &str, recipient: &str, dir_ext: &str) -> PathBuf {
        root.join(format!("{sender}{dir_ext}")).join(recipient)
    }

    /// `<root>/<recipient><ext>/<sender>`
    pub fn read_dir(root: &Path, sender: &str, recipient: &str, dir_ext: &str) -> PathBuf {
        root.join(format!("{recipient}{dir_ext}")).join(sender)
    }
}
