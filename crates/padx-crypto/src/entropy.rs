//! Entropy mixer for pad generation
//!
//! ```text
//! key, iv  = OsRng(32 + 16) ^ source_1(32 + 16) ^ ... ^ source_n(32 + 16)
//! block_i  = AES-256-CTR(key, iv) ^ (OsRng(1024) ^ source_1(1024) ^ ... ^ source_n(1024))
//! ```
//!
//! The output is unpredictable as long as at least one contributor is.
//! Nothing here checks that any contributor actually is.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use padx_core::config::EntropyConfig;
use padx_core::{PadxError, PadxResult};

use crate::format::{AES_KEY_LEN, IV_LEN};
use crate::primitives::{fill_random, xor_into, AesKey, CtrWhitener};

/// Size of one mixed output block.
pub const MIX_BLOCK: usize = 1024;

/// Informational class of an external source. Both classes are mixed the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// True / hardware random generator (`CSTRNG`)
    Cstrng,
    /// Pseudo-random generator (`PRNG`)
    Prng,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Cstrng => f.write_str("CSTRNG"),
            SourceKind::Prng => f.write_str("PRNG"),
        }
    }
}

pub struct EntropySource {
    kind: SourceKind,
    label: String,
    reader: Box<dyn Read + Send>,
}

impl EntropySource {
    pub fn from_reader(kind: SourceKind, label: impl Into<String>, reader: impl Read + Send + 'static) -> Self {
        Self {
            kind,
            label: label.into(),
            reader: Box::new(reader),
        }
    }

    pub fn open(kind: SourceKind, path: &Path) -> PadxResult<Self> {
        let file = File::open(path).map_err(|e| {
            PadxError::Entropy(format!("opening {kind} source {}: {e}", path.display()))
        })?;
        Ok(Self::from_reader(kind, path.display().to_string(), file))
    }

    /// Open every configured source, CSTRNG sources first.
    pub fn open_all(config: &EntropyConfig) -> PadxResult<Vec<Self>> {
        if config.cstrng.is_empty() {
            tracing::warn!("no CSTRNG in use (this should remain secure in most cases)");
            if config.prng.is_empty() {
                tracing::warn!("no external entropy source configured; pads rely on the system RNG alone");
            }
        }

        let cstrng = config.cstrng.iter().map(|p| (SourceKind::Cstrng, p));
        let prng = config.prng.iter().map(|p| (SourceKind::Prng, p));
        cstrng
            .chain(prng)
            .map(|(kind, path)| Self::open(kind, path))
            .collect()
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn read_into(&mut self, buf: &mut [u8]) -> PadxResult<()> {
        self.reader.read_exact(buf).map_err(|e| {
            PadxError::Entropy(format!(
                "{} source {}: could not read {} bytes: {e}",
                self.kind,
                self.label,
                buf.len()
            ))
        })
    }

    /// Read `buf.len()` bytes from this source and XOR them into `buf`.
    fn mix_into(&mut self, buf: &mut [u8], scratch: &mut Vec<u8>) -> PadxResult<()> {
        scratch.resize(buf.len(), 0);
        self.read_into(scratch)?;
        xor_into(buf, scratch);
        Ok(())
    }
}

impl std::fmt::Debug for EntropySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntropySource")
            .field("kind", &self.kind)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Unbounded keystream for pad bodies.
pub struct EntropyMixer {
    sources: Vec<EntropySource>,
    whitener: CtrWhitener,
    scratch: Vec<u8>,
}

impl EntropyMixer {
    /// Derive the one-time whitening key from the system RNG and every source.
    pub fn new(mut sources: Vec<EntropySource>) -> PadxResult<Self> {
        let mut key = AesKey::default();
        let mut iv = [0u8; IV_LEN];
        fill_random(&mut iv)?;
        fill_random(key.as_mut_bytes())?;

        let mut scratch = Vec::with_capacity(MIX_BLOCK);
        for source in &mut sources {
            tracing::debug!(kind = %source.kind(), source = source.label(), "mixing entropy source");
            source.mix_into(&mut iv, &mut scratch)?;
            source.mix_into(key.as_mut_bytes(), &mut scratch)?;
        }

        tracing::debug!(
            sources = sources.len(),
            key_len = AES_KEY_LEN,
            "entropy mixer ready"
        );

        let whitener = CtrWhitener::new(&key, &iv);
        Ok(Self {
            sources,
            whitener,
            scratch,
        })
    }

    /// A mixer fed by the system RNG alone.
    pub fn system_only() -> PadxResult<Self> {
        Self::new(Vec::new())
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Produce the next mixed block.
    pub fn fill_block(&mut self, block: &mut [u8; MIX_BLOCK]) -> PadxResult<()> {
        fill_random(block)?;
        for source in &mut self.sources {
            source.mix_into(block, &mut self.scratch)?;
        }
        self.whitener.apply(block);
        Ok(())
    }
}

impl std::fmt::Debug for EntropyMixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntropyMixer")
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}
