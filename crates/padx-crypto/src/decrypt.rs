//! Decrypt pipeline
//!
//! Runs only after [`find_pad`] has authenticated the container. Both files
//! are reopened from the start because CFB state cannot be rewound.
//!
//! [`find_pad`]: crate::discovery::find_pad

use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use padx_core::config::DEFAULT_BUFFER_SIZE;
use padx_core::naming::plaintext_name;
use padx_core::{PadxError, PadxResult};

use crate::discovery::find_pad;
use crate::files::{self, regular_file_len, PendingFile};
use crate::format::{
    read_exact_or_short, Header, PadPrelude, CONTAINER_OVERHEAD, HEADER_LEN, IV_LEN,
};
use crate::primitives::{xor_into, CfbDecryptor};

#[derive(Debug, Clone)]
pub struct DecryptOptions {
    pub ciphertext: PathBuf,
    /// A `.r.pad` file or a directory holding candidates.
    pub pad: PathBuf,
    pub buffer_size: usize,
}

impl DecryptOptions {
    pub fn new(ciphertext: impl Into<PathBuf>, pad: impl Into<PathBuf>) -> Self {
        Self {
            ciphertext: ciphertext.into(),
            pad: pad.into(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptReport {
    pub plaintext: PathBuf,
    /// The pad that authenticated the ciphertext.
    pub pad: PathBuf,
    pub plaintext_size: u64,
}

/// Authenticate `<name>.enc` against the candidate pads and write `<name>`.
pub fn decrypt_file(opts: &DecryptOptions) -> PadxResult<DecryptReport> {
    let plaintext = plaintext_name(&opts.ciphertext)?;
    let ciphertext_size = regular_file_len(&opts.ciphertext)?;

    let pad_path = find_pad(&opts.ciphertext, &opts.pad, opts.buffer_size)?
        .ok_or_else(|| PadxError::NoValidPad(opts.ciphertext.clone()))?;

    let mut ciphertext = BufReader::new(files::open(&opts.ciphertext)?);
    let mut pad = BufReader::new(files::open(&pad_path)?);
    let mut output = PendingFile::create(&plaintext)?;

    let plaintext_size = {
        let mut out = BufWriter::new(output.as_file_mut());
        let written = unseal(
            &opts.ciphertext,
            &mut ciphertext,
            ciphertext_size,
            &mut pad,
            &mut out,
            opts.buffer_size,
        )?;
        out.flush()?;
        written
    };
    output.commit()?;

    tracing::info!(
        ciphertext = %opts.ciphertext.display(),
        plaintext = %plaintext.display(),
        pad = %pad_path.display(),
        plaintext_size,
        "decrypted"
    );

    Ok(DecryptReport {
        plaintext,
        pad: pad_path,
        plaintext_size,
    })
}

/// Recover the plaintext of an authenticated container into `out`.
///
/// `name` only labels a [`PadxError::Malformed`] error. Any size-hiding
/// padding after the plaintext is left unread.
pub fn unseal<C: Read, P: Read, W: Write>(
    name: &Path,
    ciphertext: &mut C,
    ciphertext_size: u64,
    pad: &mut P,
    out: &mut W,
    buffer_size: usize,
) -> PadxResult<u64> {
    let (mut session, plaintext_size) = DecryptSession::start(ciphertext, pad)?;

    let fits = ciphertext_size
        .checked_sub(plaintext_size)
        .is_some_and(|spare| spare >= CONTAINER_OVERHEAD);
    if !fits {
        tracing::warn!(
            ciphertext = %name.display(),
            ciphertext_size,
            plaintext_size,
            "header size does not fit the container"
        );
        return Err(PadxError::Malformed(name.to_path_buf()));
    }

    let buffer_size = buffer_size.max(1);
    let mut buf = vec![0u8; buffer_size];
    let mut pad_buf = vec![0u8; buffer_size];
    let mut remaining = plaintext_size;
    while remaining > 0 {
        let n = remaining.min(buffer_size as u64) as usize;
        session.next_block(&mut buf[..n], &mut pad_buf[..n])?;
        out.write_all(&buf[..n])?;
        remaining -= n as u64;
    }
    Ok(plaintext_size)
}

/// Per-container decrypt state, positioned just past the header.
struct DecryptSession<'a, C: Read, P: Read> {
    ciphertext: &'a mut C,
    pad: &'a mut P,
    cipher: CfbDecryptor,
}

impl<'a, C: Read, P: Read> DecryptSession<'a, C, P> {
    /// Read the prelude and header and return the recorded plaintext size.
    fn start(ciphertext: &'a mut C, pad: &'a mut P) -> PadxResult<(Self, u64)> {
        let prelude = PadPrelude::read(&mut *pad)?;

        let mut iv = [0u8; IV_LEN];
        read_exact_or_short(&mut *ciphertext, &mut iv, "ciphertext")?;
        let mut header = [0u8; HEADER_LEN];
        read_exact_or_short(&mut *ciphertext, &mut header, "ciphertext")?;

        let mut cipher = CfbDecryptor::new(&prelude.aes_key, &iv);
        cipher.apply(&mut header);
        xor_into(&mut header, prelude.header_mask());
        let plaintext_size = Header::decode(&header).plaintext_size;

        Ok((
            Self {
                ciphertext,
                pad,
                cipher,
            },
            plaintext_size,
        ))
    }

    /// Decrypt the next `buf.len()` body bytes in place.
    fn next_block(&mut self, buf: &mut [u8], pad_buf: &mut [u8]) -> PadxResult<()> {
        read_exact_or_short(&mut *self.ciphertext, buf, "ciphertext")?;
        read_exact_or_short(&mut *self.pad, pad_buf, "pad")?;
        self.cipher.apply(buf);
        xor_into(buf, pad_buf);
        Ok(())
    }
}
