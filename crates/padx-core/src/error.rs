use std::path::PathBuf;

use thiserror::Error;

pub type PadxResult<T> = Result<T, PadxError>;

/// Process exit status on success.
pub const EXIT_SUCCESS: i32 = 0;

/// Exit status for a pad that was rejected: too short to encrypt with, or
/// no candidate authenticates the ciphertext.
pub const EXIT_REJECTED: i32 = 1;

/// Exit status for every other failure.
pub const EXIT_ERROR: i32 = 9;

#[derive(Debug, Error)]
pub enum PadxError {
    #[error("usage error: {0}")]
    Usage(String),

    #[error("the pad is too short ({pad_size} bytes for a {plaintext_size} byte plaintext)")]
    PadTooShort { pad_size: u64, plaintext_size: u64 },

    #[error("failed to find valid pad for `{}`", .0.display())]
    NoValidPad(PathBuf),

    #[error("{} is authenticated but malformed", .0.display())]
    Malformed(PathBuf),

    #[error("short read from {what}: expected {expected} bytes")]
    ShortRead { what: String, expected: u64 },

    #[error("entropy error: {0}")]
    Entropy(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PadxError {
    pub fn exit_code(&self) -> i32 {
        match self {
            PadxError::PadTooShort { .. } | PadxError::NoValidPad(_) => EXIT_REJECTED,
            _ => EXIT_ERROR,
        }
    }

    pub fn short_read(what: impl Into<String>, expected: u64) -> Self {
        PadxError::ShortRead {
            what: what.into(),
            expected,
        }
    }
}
