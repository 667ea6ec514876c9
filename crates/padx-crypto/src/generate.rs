//! Pad generation
//!
//! Forms:
//! - one pad at a given path
//! - `count` pairs for each direction of a channel A <-> B
//! - `count` pairs for every `sender -> recipient` edge of a peers CSV
//!
//! A pair is written to two temporary files in the final directories and
//! persisted only once both are complete. Existing pads are never overwritten.

use std::fs::DirBuilder;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use padx_core::config::PadsConfig;
use padx_core::naming::{timestamp_base, PadPairPaths};
use padx_core::{PadxError, PadxResult};

use crate::entropy::{EntropyMixer, MIX_BLOCK};
use crate::files::{with_path, PendingFile};

/// Pad sizes are given in KiB.
pub const KIB: u64 = 1024;

/// One CSV row: a sender and everyone it writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRow {
    pub sender: String,
    pub recipients: Vec<String>,
}

/// Parse `sender,r1,r2,...` rows. Fields are trimmed; blank lines and
/// `#` comment lines are skipped. A row holding only a sender has no edges.
pub fn parse_peers_csv(text: &str) -> PadxResult<Vec<PeerRow>> {
    let mut rows = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        for field in &fields {
            validate_peer(field)
                .map_err(|e| PadxError::Usage(format!("peers file line {}: {e}", idx + 1)))?;
        }
        rows.push(PeerRow {
            sender: fields[0].to_string(),
            recipients: fields[1..].iter().map(|s| s.to_string()).collect(),
        });
    }
    Ok(rows)
}

/// Peer names become directory names.
fn validate_peer(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("empty peer name".into());
    }
    if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(format!("invalid peer name {name:?}"));
    }
    Ok(())
}

pub struct Generator {
    mixer: EntropyMixer,
    dir_ext: String,
    dir_mode: u32,
    last_base: u128,
}

impl Generator {
    pub fn new(mixer: EntropyMixer, pads: &PadsConfig) -> Self {
        Self {
            mixer,
            dir_ext: pads.dir_ext.clone(),
            dir_mode: pads.dir_mode,
            last_base: 0,
        }
    }

    /// Write a single pad of `size_kib` KiB at `path`.
    pub fn generate_pad(&mut self, size_kib: u64, path: &Path) -> PadxResult<()> {
        let mut pending = PendingFile::create(path)?;
        {
            let mut out = BufWriter::new(pending.as_file_mut());
            let mut outs: [&mut dyn Write; 1] = [&mut out];
            self.stream_blocks(size_kib, &mut outs)?;
            out.flush()?;
        }
        pending.commit_new()?;
        tracing::info!(path = %path.display(), size_kib, "pad written");
        Ok(())
    }

    /// Write identical bytes to both pads of a pair.
    pub fn generate_pair(&mut self, size_kib: u64, pair: &PadPairPaths) -> PadxResult<()> {
        let mut pending_w = PendingFile::create(&pair.write_pad)?;
        let mut pending_r = PendingFile::create(&pair.read_pad)?;
        {
            let mut w = BufWriter::new(pending_w.as_file_mut());
            let mut r = BufWriter::new(pending_r.as_file_mut());
            let mut outs: [&mut dyn Write; 2] = [&mut w, &mut r];
            self.stream_blocks(size_kib, &mut outs)?;
            w.flush()?;
            r.flush()?;
        }
        pending_w.commit_new()?;
        if let Err(e) = pending_r.commit_new() {
            // Half a pair is useless; drop the write side again
            if let Err(cleanup) = std::fs::remove_file(&pair.write_pad) {
                tracing::warn!(
                    write_pad = %pair.write_pad.display(),
                    error = %cleanup,
                    "could not remove half-written pad pair"
                );
            }
            return Err(e);
        }
        tracing::info!(
            write_pad = %pair.write_pad.display(),
            read_pad = %pair.read_pad.display(),
            size_kib,
            "pad pair written"
        );
        Ok(())
    }

    /// Generate `count` pairs for the directed edge `sender -> recipient` under `root`.
    ///
    /// `on_pair` sees each pair once it is on disk. Returns the number of pairs written.
    pub fn generate_edge<F: FnMut(&PadPairPaths)>(
        &mut self,
        root: &Path,
        sender: &str,
        recipient: &str,
        size_kib: u64,
        count: u64,
        mut on_pair: F,
    ) -> PadxResult<u64> {
        validate_peer(sender).map_err(PadxError::Usage)?;
        validate_peer(recipient).map_err(PadxError::Usage)?;

        let write_dir = PadPairPaths::write_dir(root, sender, recipient, &self.dir_ext);
        let read_dir = PadPairPaths::read_dir(root, sender, recipient, &self.dir_ext);

        for _ in 0..count {
            self.create_dir(&write_dir)?;
            self.create_dir(&read_dir)?;
            let base = self.next_base();
            let pair = PadPairPaths::for_edge(root, sender, recipient, &base, &self.dir_ext);
            self.generate_pair(size_kib, &pair)?;
            on_pair(&pair);
        }
        Ok(count)
    }

    /// Both directions of the channel `a <-> b`: first `a -> b`, then `b -> a`.
    pub fn generate_channel<F: FnMut(&PadPairPaths)>(
        &mut self,
        root: &Path,
        a: &str,
        b: &str,
        size_kib: u64,
        count: u64,
        on_pair: F,
    ) -> PadxResult<u64> {
        let rows = [
            PeerRow {
                sender: a.to_string(),
                recipients: vec![b.to_string()],
            },
            PeerRow {
                sender: b.to_string(),
                recipients: vec![a.to_string()],
            },
        ];
        self.generate_from_edges(root, &rows, size_kib, count, on_pair)
    }

    /// Every `sender -> recipient` edge in `rows`, in file order.
    pub fn generate_from_edges<F: FnMut(&PadPairPaths)>(
        &mut self,
        root: &Path,
        rows: &[PeerRow],
        size_kib: u64,
        count: u64,
        mut on_pair: F,
    ) -> PadxResult<u64> {
        let mut total = 0u64;
        for row in rows {
            for recipient in &row.recipients {
                let written =
                    self.generate_edge(root, &row.sender, recipient, size_kib, count, &mut on_pair)?;
                total = total.saturating_add(written);
            }
        }
        Ok(total)
    }

    fn stream_blocks(&mut self, size_kib: u64, outs: &mut [&mut dyn Write]) -> PadxResult<()> {
        let mut block = [0u8; MIX_BLOCK];
        for _ in 0..size_kib {
            self.mixer.fill_block(&mut block)?;
            for out in outs.iter_mut() {
                out.write_all(&block)?;
            }
        }
        Ok(())
    }

    fn create_dir(&self, dir: &Path) -> PadxResult<()> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(self.dir_mode);
        }
        builder
            .create(dir)
            .map_err(|e| with_path(e, "creating", dir))
    }

    /// Hex nanosecond timestamp, strictly increasing within this generator.
    fn next_base(&mut self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        self.last_base = now.max(self.last_base + 1);
        timestamp_base(self.last_base)
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("dir_ext", &self.dir_ext)
            .field("dir_mode", &format_args!("{:o}", self.dir_mode))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> Generator {
        Generator::new(EntropyMixer::system_only().unwrap(), &PadsConfig::default())
    }

    #[test]
    fn parse_csv_rows() {
        let rows = parse_peers_csv("Alice, Bob ,Carol\n\n# comment\nBob,Alice\n").unwrap();
        assert_eq!(
            rows,
            vec![
                PeerRow {
                    sender: "Alice".into(),
                    recipients: vec!["Bob".into(), "Carol".into()],
                },
                PeerRow {
                    sender: "Bob".into(),
                    recipients: vec!["Alice".into()],
                },
            ]
        );
    }

    /// Run `generate_edge` and keep every pair it reports.
    fn collect_edge(
        gen: &mut Generator,
        root: &Path,
        size_kib: u64,
        count: u64,
    ) -> Vec<PadPairPaths> {
        let mut pairs = Vec::new();
        let n = gen
            .generate_edge(root, "Alice", "Bob", size_kib, count, |p| pairs.push(p.clone()))
            .unwrap();
        assert_eq!(n, pairs.len() as u64);
        pairs
    }

    #[test]
    fn parse_csv_lonely_sender_has_no_edges() {
        let rows = parse_peers_csv("Alice,Bob\nCarol\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].sender, "Carol");
        assert!(rows[1].recipients.is_empty());

        let dir = tempfile::TempDir::new().unwrap();
        let n = generator()
            .generate_from_edges(dir.path(), &rows[1..], 1, 5, |_| {})
            .unwrap();
        assert_eq!(n, 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn huge_count_fails_cleanly_without_preallocating() {
        let dir = tempfile::TempDir::new().unwrap();
        // A plain file where the sender's pad directory should go
        std::fs::write(dir.path().join("Alice.pads"), b"in the way").unwrap();
        let err = generator()
            .generate_edge(dir.path(), "Alice", "Bob", 0, u64::MAX, |_| {})
            .unwrap_err();
        assert!(matches!(err, PadxError::Io(_)));
    }

    #[test]
    fn parse_csv_rejects_path_like_names() {
        assert!(parse_peers_csv("Alice,../etc").is_err());
        assert!(parse_peers_csv("Alice,,Bob").is_err());
    }

    #[test]
    fn single_pad_has_requested_size() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("solo.w.pad");
        generator().generate_pad(3, &path).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 3 * KIB);
    }

    #[test]
    fn zero_size_pad_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("empty.w.pad");
        generator().generate_pad(0, &path).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn existing_pad_is_not_overwritten() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("taken.w.pad");
        std::fs::write(&path, b"keep me").unwrap();
        assert!(generator().generate_pad(1, &path).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
    }

    #[test]
    fn pair_files_are_identical() {
        let dir = tempfile::TempDir::new().unwrap();
        let pairs = collect_edge(&mut generator(), dir.path(), 2, 3);
        assert_eq!(pairs.len(), 3);
        for pair in &pairs {
            let w = std::fs::read(&pair.write_pad).unwrap();
            let r = std::fs::read(&pair.read_pad).unwrap();
            assert_eq!(w.len() as u64, 2 * KIB);
            assert_eq!(w, r);
        }
        // Distinct pads per pair
        let first = std::fs::read(&pairs[0].write_pad).unwrap();
        let second = std::fs::read(&pairs[1].write_pad).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn clashing_read_pad_drops_write_pad() {
        let dir = tempfile::TempDir::new().unwrap();
        let pair = PadPairPaths {
            write_pad: dir.path().join("clash.w.pad"),
            read_pad: dir.path().join("clash.r.pad"),
        };
        std::fs::write(&pair.read_pad, b"older pad").unwrap();

        assert!(generator().generate_pair(1, &pair).is_err());
        assert!(!pair.write_pad.exists());
        assert_eq!(std::fs::read(&pair.read_pad).unwrap(), b"older pad");
    }

    #[test]
    fn base_names_strictly_increase() {
        let mut gen = generator();
        let a = u128::from_str_radix(&gen.next_base(), 16).unwrap();
        let b = u128::from_str_radix(&gen.next_base(), 16).unwrap();
        assert!(b > a);
    }

    #[cfg(unix)]
    #[test]
    fn pad_directories_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        collect_edge(&mut generator(), dir.path(), 1, 1);
        let mode = std::fs::metadata(dir.path().join("Alice.pads/Bob"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o077, 0);
    }

    #[test]
    fn no_temporary_files_left_behind() {
        let dir = tempfile::TempDir::new().unwrap();
        generator()
            .generate_channel(dir.path(), "Alice", "Bob", 1, 1, |_| {})
            .unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("Alice.pads/Bob"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
