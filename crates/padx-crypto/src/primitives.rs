//! Thin wrappers over the RustCrypto primitives used by the container and
//! the pad generator.
//!
//! - AES-256-CFB (128-bit feedback), stateful across arbitrary-length calls
//! - AES-256-CTR (128-bit big-endian counter) for generator whitening
//! - HMAC-SHA-512 over the whole container
//! - OS CSPRNG

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes256;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha512;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use padx_core::{PadxError, PadxResult};

use crate::format::{AES_KEY_LEN, HEADER_LEN, HMAC_KEY_LEN, IV_LEN, TAG_LEN};

type HmacSha512 = Hmac<Sha512>;

/// A fixed-size secret taken from a pad or the system RNG. Zeroized on drop.
#[derive(Clone)]
pub struct SecretKey<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> SecretKey<N> {
    pub fn from_bytes(bytes: [u8; N]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8; N] {
        &mut self.bytes
    }
}

impl<const N: usize> Default for SecretKey<N> {
    fn default() -> Self {
        Self { bytes: [0u8; N] }
    }
}

impl<const N: usize> Drop for SecretKey<N> {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl<const N: usize> std::fmt::Debug for SecretKey<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("len", &N)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

pub type HmacKey = SecretKey<HMAC_KEY_LEN>;
pub type AesKey = SecretKey<AES_KEY_LEN>;
pub type HeaderMask = SecretKey<HEADER_LEN>;

/// AES-256-CFB encryptor. Keeps its feedback state between calls, so a
/// stream may be fed in blocks of any length.
pub struct CfbEncryptor {
    inner: cfb_mode::BufEncryptor<Aes256>,
}

impl CfbEncryptor {
    pub fn new(key: &AesKey, iv: &[u8; IV_LEN]) -> Self {
        Self {
            inner: cfb_mode::BufEncryptor::<Aes256>::new(
                GenericArray::from_slice(key.as_bytes()),
                GenericArray::from_slice(iv),
            ),
        }
    }

    pub fn apply(&mut self, buf: &mut [u8]) {
        self.inner.encrypt(buf);
    }
}

/// AES-256-CFB decryptor, the inverse of [`CfbEncryptor`].
pub struct CfbDecryptor {
    inner: cfb_mode::BufDecryptor<Aes256>,
}

impl CfbDecryptor {
    pub fn new(key: &AesKey, iv: &[u8; IV_LEN]) -> Self {
        Self {
            inner: cfb_mode::BufDecryptor::<Aes256>::new(
                GenericArray::from_slice(key.as_bytes()),
                GenericArray::from_slice(iv),
            ),
        }
    }

    pub fn apply(&mut self, buf: &mut [u8]) {
        self.inner.decrypt(buf);
    }
}

/// AES-256-CTR keystream XOR.
pub struct CtrWhitener {
    inner: ctr::Ctr128BE<Aes256>,
}

impl CtrWhitener {
    pub fn new(key: &AesKey, iv: &[u8; IV_LEN]) -> Self {
        Self {
            inner: ctr::Ctr128BE::<Aes256>::new(
                GenericArray::from_slice(key.as_bytes()),
                GenericArray::from_slice(iv),
            ),
        }
    }

    pub fn apply(&mut self, buf: &mut [u8]) {
        self.inner.apply_keystream(buf);
    }
}

/// Running HMAC-SHA-512 over a container.
pub struct ContainerMac {
    inner: HmacSha512,
}

impl ContainerMac {
    pub fn new(key: &HmacKey) -> PadxResult<Self> {
        let inner = <HmacSha512 as Mac>::new_from_slice(key.as_bytes())
            .map_err(|e| anyhow::anyhow!("HMAC-SHA-512 init failed: {e}"))?;
        Ok(Self { inner })
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finalize(self) -> [u8; TAG_LEN] {
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&self.inner.finalize().into_bytes());
        tag
    }

    /// Constant-time comparison against a stored tag.
    pub fn verify(self, tag: &[u8; TAG_LEN]) -> bool {
        tags_equal(&self.finalize(), tag)
    }
}

pub fn tags_equal(a: &[u8; TAG_LEN], b: &[u8; TAG_LEN]) -> bool {
    a.ct_eq(b).into()
}

/// Fill `buf` from the operating system CSPRNG.
pub fn fill_random(buf: &mut [u8]) -> PadxResult<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| PadxError::Entropy(format!("system RNG failed: {e}")))
}

/// XOR `src` into `dst` byte by byte. Both slices must have the same length.
pub fn xor_into(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}
