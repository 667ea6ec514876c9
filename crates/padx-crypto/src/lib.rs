//! padx-crypto: pad-based file encryption
//!
//! Construction: pad XOR, then AES-256-CFB, authenticated with HMAC-SHA-512
//!
//! Pipeline: plaintext → XOR pad material → CFB encrypt → HMAC → `<name>.enc`
//!
//! Pad lifecycle:
//! ```text
//! generate ──┬── Sender.pads/Recipient/<t>.w.pad ── encrypt ──► <t>.x.pad (burned)
//!            └── Recipient.pads/Sender/<t>.r.pad ── decrypt (found by trial)
//! ```
//!
//! Every pad supplies its own keys: the first 96 bytes key the HMAC, the next
//! 32 key AES, the next 16 mask the header. Nothing is derived or reused.

pub mod decrypt;
pub mod discovery;
pub mod encrypt;
pub mod entropy;
pub mod files;
pub mod format;
pub mod generate;
pub mod primitives;

pub use decrypt::{decrypt_file, unseal, DecryptOptions, DecryptReport};
pub use discovery::{authenticate, find_pad};
pub use encrypt::{encrypt_file, seal, EncryptOptions, EncryptReport};
pub use entropy::{EntropyMixer, EntropySource, SourceKind, MIX_BLOCK};
pub use format::{ciphertext_len, Header, PaddingMode, CONTAINER_OVERHEAD, PAD_OVERHEAD, PAD_PRELUDE};
pub use generate::{parse_peers_csv, Generator, PeerRow, KIB};
