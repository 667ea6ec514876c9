use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PadxError, PadxResult};

/// Default streaming block size: 1 MiB.
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Top-level configuration (loaded from padx.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PadxConfig {
    pub logging: LoggingConfig,
    pub io: IoConfig,
    pub entropy: EntropyConfig,
    pub pads: PadsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    /// Streaming block size in bytes. Has no effect on the bytes written.
    pub buffer_size: usize,
}

/// External entropy sources mixed into generated pads.
///
/// Both classes contribute identically; the split only documents what the
/// operator believes each file to be.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntropyConfig {
    /// True / hardware random sources (env: CSTRNG)
    pub cstrng: Vec<PathBuf>,
    /// Supplemental pseudo-random sources (env: PRNG)
    pub prng: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PadsConfig {
    /// Suffix of per-peer pad directories (default: ".pads")
    pub dir_ext: String,
    /// Permission bits for created pad directories (default: 0o700)
    pub dir_mode: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl Default for PadsConfig {
    fn default() -> Self {
        Self {
            dir_ext: crate::naming::PAD_DIR_EXT.into(),
            dir_mode: 0o700,
        }
    }
}

impl PadxConfig {
    /// Load from a TOML file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> PadxResult<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {} (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| PadxError::Config(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| PadxError::Config(format!("parsing {}: {e}", path.display())))
    }

    /// Override entropy sources from the `CSTRNG` / `PRNG` environment variables.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(list) = lookup("CSTRNG") {
            self.entropy.cstrng = split_path_list(&list);
        }
        if let Some(list) = lookup("PRNG") {
            self.entropy.prng = split_path_list(&list);
        }
    }

    pub fn validate(&self) -> PadxResult<()> {
        if self.io.buffer_size == 0 {
            return Err(PadxError::Config("io.buffer_size must be > 0".into()));
        }
        if self.pads.dir_ext.is_empty() || self.pads.dir_ext.contains(std::path::MAIN_SEPARATOR) {
            return Err(PadxError::Config(format!(
                "invalid pads.dir_ext: {:?}",
                self.pads.dir_ext
            )));
        }
        match self.logging.format.as_str() {
            "json" | "text" => Ok(()),
            other => Err(PadxError::Config(format!(
                "logging.format must be \"json\" or \"text\", got {other:?}"
            ))),
        }
    }
}

/// Split a colon-separated path list, ignoring empty items.
pub fn split_path_list(list: &str) -> Vec<PathBuf> {
    list.split(':')
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}
