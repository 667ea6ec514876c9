//! Pad discovery: find the `.r.pad` that authenticates a ciphertext.
//!
//! Each candidate is checked with a cheap probe before the full HMAC pass:
//!
//! 1. `pad_size - ciphertext_size >= 48`
//! 2. CFB-decrypt the first 8 header bytes; the plaintext header starts with
//!    8 zero bytes, so the result must equal the first 8 mask bytes
//! 3. HMAC everything up to the trailing tag and compare in constant time
//!
//! Nothing is written while probing.

use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use subtle::ConstantTimeEq;

use padx_core::naming::PadState;
use padx_core::PadxResult;

use crate::files::{self, regular_file_len, with_path};
use crate::format::{
    read_exact_or_short, PadPrelude, CONTAINER_OVERHEAD, HEADER_ZERO_LEN, IV_LEN, PAD_OVERHEAD,
    TAG_LEN,
};
use crate::primitives::{tags_equal, CfbDecryptor, ContainerMac};

/// Whether `pad` authenticates the container read from `ciphertext`.
///
/// Both readers must be positioned at the start of their files.
pub fn authenticate<C: Read, P: Read>(
    ciphertext: &mut C,
    ciphertext_size: u64,
    pad: &mut P,
    buffer_size: usize,
) -> PadxResult<bool> {
    if ciphertext_size < CONTAINER_OVERHEAD {
        return Ok(false);
    }

    let prelude = PadPrelude::read_with_mask(pad, HEADER_ZERO_LEN)?;

    let mut iv = [0u8; IV_LEN];
    read_exact_or_short(ciphertext, &mut iv, "ciphertext")?;
    let mut head = [0u8; HEADER_ZERO_LEN];
    read_exact_or_short(ciphertext, &mut head, "ciphertext")?;

    let mut mac = ContainerMac::new(&prelude.hmac_key)?;
    mac.update(&iv);
    mac.update(&head);

    let mut probe = head;
    CfbDecryptor::new(&prelude.aes_key, &iv).apply(&mut probe);
    if !bool::from(probe.as_slice().ct_eq(prelude.header_mask())) {
        return Ok(false);
    }

    let buffer_size = buffer_size.max(1);
    let mut buf = vec![0u8; buffer_size];
    let mut remaining = ciphertext_size - (IV_LEN + HEADER_ZERO_LEN + TAG_LEN) as u64;
    while remaining > 0 {
        let n = remaining.min(buffer_size as u64) as usize;
        read_exact_or_short(ciphertext, &mut buf[..n], "ciphertext")?;
        mac.update(&buf[..n]);
        remaining -= n as u64;
    }

    let mut tag = [0u8; TAG_LEN];
    read_exact_or_short(ciphertext, &mut tag, "ciphertext")?;
    Ok(tags_equal(&mac.finalize(), &tag))
}

/// Search `candidate` (a `.r.pad` file or a directory of them) for the pad
/// that authenticates `ciphertext`.
///
/// Directories are searched one level deep, in file-name order.
pub fn find_pad(
    ciphertext: &Path,
    candidate: &Path,
    buffer_size: usize,
) -> PadxResult<Option<PathBuf>> {
    let ciphertext_size = regular_file_len(ciphertext)?;
    let meta = std::fs::metadata(candidate).map_err(|e| with_path(e, "stat", candidate))?;

    if meta.is_dir() {
        let mut entries = std::fs::read_dir(candidate)
            .map_err(|e| with_path(e, "reading directory", candidate))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| with_path(e, "reading directory", candidate))?;
        entries.sort();

        tracing::debug!(
            dir = %candidate.display(),
            entries = entries.len(),
            "searching pad directory"
        );
        for path in entries {
            if try_candidate(ciphertext, ciphertext_size, &path, buffer_size)? {
                return Ok(Some(path));
            }
        }
        return Ok(None);
    }

    if try_candidate(ciphertext, ciphertext_size, candidate, buffer_size)? {
        Ok(Some(candidate.to_path_buf()))
    } else {
        Ok(None)
    }
}

/// Probe a single path. Anything that is not a large enough regular
/// `.r.pad` file is skipped.
fn try_candidate(
    ciphertext: &Path,
    ciphertext_size: u64,
    pad: &Path,
    buffer_size: usize,
) -> PadxResult<bool> {
    let meta = std::fs::metadata(pad).map_err(|e| with_path(e, "stat", pad))?;
    if !meta.is_file() || PadState::from_path(pad) != Some(PadState::Read) {
        return Ok(false);
    }
    if meta.len().saturating_sub(ciphertext_size) < PAD_OVERHEAD {
        tracing::trace!(pad = %pad.display(), pad_size = meta.len(), "pad too short");
        return Ok(false);
    }

    let mut ct = BufReader::new(files::open(ciphertext)?);
    let mut pad_file = BufReader::new(files::open(pad)?);
    let ok = authenticate(&mut ct, ciphertext_size, &mut pad_file, buffer_size)?;
    tracing::debug!(pad = %pad.display(), authenticated = ok, "probed pad");
    Ok(ok)
}
