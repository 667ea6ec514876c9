//! Encrypt pipeline
//!
//! ```text
//! pad:     [hmac_key 96][aes_key 32][mask 16][m_0 m_1 ... ]
//! out:     IV || CFB(header ^ mask) || CFB(p_i ^ m_i)... || CFB(0 ^ m_j)... || HMAC
//! ```
//!
//! The pad is renamed `.w.pad -> .x.pad` before the first ciphertext byte is
//! written and is never renamed back, whatever happens afterwards.

use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use padx_core::config::DEFAULT_BUFFER_SIZE;
use padx_core::naming::{ciphertext_name, consumed_name};
use padx_core::{PadxError, PadxResult};

use crate::files::{self, regular_file_len, PendingFile};
use crate::format::{
    body_len, read_exact_or_short, Header, PadPrelude, PaddingMode, IV_LEN, PAD_PRELUDE,
};
use crate::primitives::{fill_random, xor_into, CfbEncryptor, ContainerMac};

#[derive(Debug, Clone)]
pub struct EncryptOptions {
    pub plaintext: PathBuf,
    pub pad: PathBuf,
    pub mode: PaddingMode,
    pub buffer_size: usize,
}

impl EncryptOptions {
    pub fn new(plaintext: impl Into<PathBuf>, pad: impl Into<PathBuf>) -> Self {
        Self {
            plaintext: plaintext.into(),
            pad: pad.into(),
            mode: PaddingMode::Long,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn mode(mut self, mode: PaddingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptReport {
    pub ciphertext: PathBuf,
    pub used_pad: PathBuf,
    pub plaintext_size: u64,
    pub ciphertext_size: u64,
}

/// Encrypt `plaintext` into `<plaintext>.enc`, consuming the `.w.pad`.
pub fn encrypt_file(opts: &EncryptOptions) -> PadxResult<EncryptReport> {
    let used_pad = consumed_name(&opts.pad)?;
    let plaintext_size = regular_file_len(&opts.plaintext)?;
    let pad_size = regular_file_len(&opts.pad)?;
    if pad_size.saturating_sub(plaintext_size) < PAD_PRELUDE {
        return Err(PadxError::PadTooShort {
            pad_size,
            plaintext_size,
        });
    }

    let ciphertext = ciphertext_name(&opts.plaintext);
    let mut plaintext = files::open(&opts.plaintext)?;
    let mut output = PendingFile::create(&ciphertext)?;

    commit_pad(&opts.pad, &used_pad)?;
    let mut pad = files::open(&used_pad)?;

    let mut iv = [0u8; IV_LEN];
    fill_random(&mut iv)?;

    let ciphertext_size = {
        let mut out = BufWriter::new(output.as_file_mut());
        let written = seal(
            &mut plaintext,
            plaintext_size,
            &mut pad,
            pad_size,
            opts.mode,
            &iv,
            &mut out,
            opts.buffer_size,
        )?;
        out.flush()?;
        written
    };
    output.commit()?;

    tracing::info!(
        plaintext = %opts.plaintext.display(),
        ciphertext = %ciphertext.display(),
        pad = %used_pad.display(),
        plaintext_size,
        ciphertext_size,
        mode = ?opts.mode,
        "encrypted"
    );

    Ok(EncryptReport {
        ciphertext,
        used_pad,
        plaintext_size,
        ciphertext_size,
    })
}

/// Mark the pad as consumed. This is the commit point against reuse.
fn commit_pad(pad: &Path, used_pad: &Path) -> PadxResult<()> {
    std::fs::rename(pad, used_pad).map_err(|e| files::with_path(e, "renaming", pad))?;
    tracing::debug!(from = %pad.display(), to = %used_pad.display(), "pad consumed");
    Ok(())
}

/// Write one container to `out` and return its length.
///
/// `pad` must be positioned at the start of the pad and hold at least
/// `144 + plaintext_size` bytes (`pad_size` in long mode).
#[allow(clippy::too_many_arguments)]
pub fn seal<P: Read, K: Read, W: Write>(
    plaintext: &mut P,
    plaintext_size: u64,
    pad: &mut K,
    pad_size: u64,
    mode: PaddingMode,
    iv: &[u8; IV_LEN],
    out: &mut W,
    buffer_size: usize,
) -> PadxResult<u64> {
    let body = body_len(pad_size, plaintext_size, mode).ok_or(PadxError::PadTooShort {
        pad_size,
        plaintext_size,
    })?;

    let prelude = PadPrelude::read(pad)?;
    let mut session = EncryptSession::start(&prelude, iv, out)?;

    let mut header = Header::new(plaintext_size).encode();
    xor_into(&mut header, prelude.header_mask());
    session.emit(&mut header)?;

    let buffer_size = buffer_size.max(1);
    let mut buf = vec![0u8; buffer_size];
    let mut pad_buf = vec![0u8; buffer_size];

    let mut remaining = plaintext_size;
    while remaining > 0 {
        let n = remaining.min(buffer_size as u64) as usize;
        read_exact_or_short(plaintext, &mut buf[..n], "plaintext")?;
        read_exact_or_short(pad, &mut pad_buf[..n], "pad")?;
        xor_into(&mut buf[..n], &pad_buf[..n]);
        session.emit(&mut buf[..n])?;
        remaining -= n as u64;
    }

    // Size-hiding padding: implicit zero plaintext, so the pad bytes are
    // encrypted as they are.
    let mut remaining = body - plaintext_size;
    while remaining > 0 {
        let n = remaining.min(buffer_size as u64) as usize;
        read_exact_or_short(pad, &mut pad_buf[..n], "pad")?;
        session.emit(&mut pad_buf[..n])?;
        remaining -= n as u64;
    }

    session.finish()
}

/// Per-container state: the CFB stream, the running MAC, and the output.
struct EncryptSession<'a, W: Write> {
    out: &'a mut W,
    cipher: CfbEncryptor,
    mac: ContainerMac,
    written: u64,
}

impl<'a, W: Write> EncryptSession<'a, W> {
    /// Write the IV and key the cipher and MAC.
    fn start(prelude: &PadPrelude, iv: &[u8; IV_LEN], out: &'a mut W) -> PadxResult<Self> {
        let mut mac = ContainerMac::new(&prelude.hmac_key)?;
        out.write_all(iv)?;
        mac.update(iv);
        Ok(Self {
            out,
            cipher: CfbEncryptor::new(&prelude.aes_key, iv),
            mac,
            written: IV_LEN as u64,
        })
    }

    /// Encrypt `buf` in place, write it, and feed it to the MAC.
    fn emit(&mut self, buf: &mut [u8]) -> PadxResult<()> {
        self.cipher.apply(buf);
        self.out.write_all(buf)?;
        self.mac.update(buf);
        self.written += buf.len() as u64;
        Ok(())
    }

    fn finish(self) -> PadxResult<u64> {
        let tag = self.mac.finalize();
        self.out.write_all(&tag)?;
        Ok(self.written + tag.len() as u64)
    }
}
