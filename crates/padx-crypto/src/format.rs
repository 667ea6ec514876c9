//! On-disk layouts
//!
//! Pad (read front to back, consumed once):
//! ```text
//! [96 bytes: HMAC-SHA-512 key][32 bytes: AES-256 key][16 bytes: header mask][pad material ...]
//! ```
//!
//! Container:
//! ```text
//! [16 bytes: IV][16 bytes: encrypted header][P or L bytes: encrypted body][64 bytes: HMAC-SHA-512]
//! tag = HMAC(hmac_key, IV || encrypted header || encrypted body)
//! ```
//!
//! Plaintext header, XORed with the header mask before CFB encryption:
//! ```text
//! [8 bytes: zero][8 bytes: plaintext size, big-endian]
//! ```

use std::io::{ErrorKind, Read};

use padx_core::{PadxError, PadxResult};

use crate::primitives::{AesKey, HeaderMask, HmacKey};

pub const HMAC_KEY_LEN: usize = 96;
pub const AES_KEY_LEN: usize = 32;
pub const HEADER_LEN: usize = 16;
pub const IV_LEN: usize = 16;
pub const TAG_LEN: usize = 64;

/// Length of the zero prefix of the header, checked by the fast probe.
pub const HEADER_ZERO_LEN: usize = 8;

/// Bytes consumed from every pad before any body material: 96 + 32 + 16.
pub const PAD_PRELUDE: u64 = (HMAC_KEY_LEN + AES_KEY_LEN + HEADER_LEN) as u64;

/// Container bytes that are not body: IV + header + tag = 96.
pub const CONTAINER_OVERHEAD: u64 = (IV_LEN + HEADER_LEN + TAG_LEN) as u64;

/// Long-mode `pad_size - ciphertext_size` = 144 - 96.
pub const PAD_OVERHEAD: u64 = PAD_PRELUDE - CONTAINER_OVERHEAD;

/// Whether the body is padded to hide the plaintext length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaddingMode {
    /// Body fills the whole pad; ciphertext length depends only on the pad.
    #[default]
    Long,
    /// No size-hiding padding. The ciphertext leaks the plaintext length.
    Short,
}

/// Key material read from the front of a pad.
///
/// The fast probe only needs the first [`HEADER_ZERO_LEN`] mask bytes; the
/// remaining mask bytes are then left unread in the pad stream.
#[derive(Debug)]
pub struct PadPrelude {
    pub hmac_key: HmacKey,
    pub aes_key: AesKey,
    header_mask: HeaderMask,
    mask_len: usize,
}

impl PadPrelude {
    /// Read the full 144-byte prelude.
    pub fn read<R: Read>(pad: &mut R) -> PadxResult<Self> {
        Self::read_with_mask(pad, HEADER_LEN)
    }

    /// Read the keys and the first `mask_len` bytes of the header mask.
    pub fn read_with_mask<R: Read>(pad: &mut R, mask_len: usize) -> PadxResult<Self> {
        assert!(mask_len <= HEADER_LEN, "header mask is {HEADER_LEN} bytes");
        let mut hmac_key = HmacKey::default();
        read_exact_or_short(pad, hmac_key.as_mut_bytes(), "pad")?;
        let mut aes_key = AesKey::default();
        read_exact_or_short(pad, aes_key.as_mut_bytes(), "pad")?;
        let mut header_mask = HeaderMask::default();
        read_exact_or_short(pad, &mut header_mask.as_mut_bytes()[..mask_len], "pad")?;
        Ok(Self {
            hmac_key,
            aes_key,
            header_mask,
            mask_len,
        })
    }

    pub fn header_mask(&self) -> &[u8] {
        &self.header_mask.as_bytes()[..self.mask_len]
    }
}

/// The 16-byte plaintext header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub plaintext_size: u64,
}

impl Header {
    pub fn new(plaintext_size: u64) -> Self {
        Self { plaintext_size }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[HEADER_ZERO_LEN..].copy_from_slice(&self.plaintext_size.to_be_bytes());
        out
    }

    /// Decode a header that has already been decrypted and unmasked.
    /// The zero prefix is not re-checked here; the probe has done that.
    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Self {
        let mut size = [0u8; 8];
        size.copy_from_slice(&bytes[HEADER_ZERO_LEN..]);
        Self {
            plaintext_size: u64::from_be_bytes(size),
        }
    }
}

/// Ciphertext length produced for a pad and plaintext of the given sizes.
///
/// Returns `None` when the pad is too short (`pad_size - plaintext_size < 144`).
pub fn ciphertext_len(pad_size: u64, plaintext_size: u64, mode: PaddingMode) -> Option<u64> {
    let spare = pad_size.checked_sub(plaintext_size)?;
    if spare < PAD_PRELUDE {
        return None;
    }
    Some(match mode {
        PaddingMode::Short => plaintext_size + CONTAINER_OVERHEAD,
        PaddingMode::Long => pad_size - PAD_OVERHEAD,
    })
}

/// Body length of a container: everything between the header and the tag.
pub fn body_len(pad_size: u64, plaintext_size: u64, mode: PaddingMode) -> Option<u64> {
    ciphertext_len(pad_size, plaintext_size, mode).map(|len| len - CONTAINER_OVERHEAD)
}

/// `read_exact` that reports end-of-file as a [`PadxError::ShortRead`].
pub(crate) fn read_exact_or_short<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    what: &str,
) -> PadxResult<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            PadxError::short_read(what, buf.len() as u64)
        } else {
            PadxError::Io(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    #[test]
    fn size_constants() {
        assert_eq!(PAD_PRELUDE, 144);
        assert_eq!(CONTAINER_OVERHEAD, 96);
        assert_eq!(PAD_OVERHEAD, 48);
    }

    #[test]
    fn header_layout() {
        let header = Header::new(0x0102_0304_0506_0708);
        let bytes = header.encode();
        assert_eq!(&bytes[..8], &[0u8; 8]);
        assert_eq!(&bytes[8..], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(Header::decode(&bytes), header);
    }

    #[test]
    fn prelude_reads_in_order() {
        let pad: Vec<u8> = (0..200u32).map(|i| i as u8).collect();
        let mut cursor = Cursor::new(pad);
        let prelude = PadPrelude::read(&mut cursor).unwrap();

        assert_eq!(prelude.hmac_key.as_bytes()[0], 0);
        assert_eq!(prelude.hmac_key.as_bytes()[95], 95);
        assert_eq!(prelude.aes_key.as_bytes()[0], 96);
        assert_eq!(prelude.header_mask(), &(128u8..144).collect::<Vec<_>>()[..]);
        assert_eq!(cursor.position(), 144);
    }

    #[test]
    fn probe_prelude_stops_after_eight_mask_bytes() {
        let mut cursor = Cursor::new(vec![0xAAu8; 144]);
        let prelude = PadPrelude::read_with_mask(&mut cursor, HEADER_ZERO_LEN).unwrap();
        assert_eq!(prelude.header_mask().len(), 8);
        assert_eq!(cursor.position(), 136);
    }

    #[test]
    fn prelude_short_pad_fails() {
        let mut cursor = Cursor::new(vec![0u8; 100]);
        let err = PadPrelude::read(&mut cursor).unwrap_err();
        assert!(matches!(err, PadxError::ShortRead { .. }));
    }

    #[test]
    fn scenario_sizes() {
        // empty plaintext, 200-byte pad, long mode
        assert_eq!(ciphertext_len(200, 0, PaddingMode::Long), Some(152));
        // 1 MiB, short mode
        let mib = 1024 * 1024;
        assert_eq!(
            ciphertext_len(2 * mib, mib, PaddingMode::Short),
            Some(mib + 96)
        );
        // 1 MiB + 1, long mode, 4 MiB pad
        assert_eq!(
            ciphertext_len(4 * mib, mib + 1, PaddingMode::Long),
            Some(4 * mib - 48)
        );
    }

    #[test]
    fn pad_too_short_boundary() {
        assert_eq!(ciphertext_len(143, 0, PaddingMode::Long), None);
        assert_eq!(ciphertext_len(144, 0, PaddingMode::Long), Some(96));
        assert_eq!(ciphertext_len(10, 20, PaddingMode::Short), None);
    }

    proptest! {
        #[test]
        fn header_roundtrip(size in any::<u64>()) {
            let bytes = Header::new(size).encode();
            prop_assert_eq!(Header::decode(&bytes).plaintext_size, size);
        }

        #[test]
        fn long_mode_hides_size(pad in 144u64..1 << 40, pt in 0u64..1 << 20) {
            prop_assume!(pad - 144 >= pt);
            prop_assert_eq!(ciphertext_len(pad, pt, PaddingMode::Long), Some(pad - 48));
            prop_assert_eq!(ciphertext_len(pad, pt, PaddingMode::Short), Some(pt + 96));
        }
    }
}
