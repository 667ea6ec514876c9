//! padx-gen: generate one-time pads
//!
//! Usage:
//!   padx-gen <size-kib> <pad-path>
//!   padx-gen <size-kib> <count> <peerA> <peerB>
//!   padx-gen <size-kib> <count> <peers.csv>
//!
//! Entropy: the system RNG, plus every file listed in `CSTRNG` / `PRNG`
//! (colon-separated) or in the `[entropy]` config section.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use padx_cli::{bootstrap, finish, parse_args, CommonArgs};
use padx_core::{PadxError, PadxResult};
use padx_crypto::{parse_peers_csv, EntropyMixer, EntropySource, Generator, KIB};

const TOOL: &str = "padx-gen";

#[derive(Parser, Debug)]
#[command(
    name = "padx-gen",
    version,
    about = "Generate one-time pads",
    after_help = "Forms:\n  padx-gen SIZE PAD-PATH\n  padx-gen SIZE COUNT PEER-A PEER-B\n  padx-gen SIZE COUNT PEERS-CSV\n\n\
                  PEERS-CSV lines have the form SENDER[,RECIPIENT...]; a sender with no\n\
                  recipients generates nothing. Fields are trimmed, and blank lines and lines\n\
                  starting with # are skipped.\n\n\
                  Exit status: 0 success, 9 error"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Root directory for per-peer pad directories (forms 2 and 3)
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Pad size in KiB (1 KiB = 1024 bytes)
    size_kib: u64,

    /// PAD-PATH | COUNT PEER-A PEER-B | COUNT PEERS-CSV
    #[arg(num_args = 1..=3, required = true, value_name = "ARGS")]
    rest: Vec<String>,
}

/// What to generate, decoded from the positional arguments.
#[derive(Debug, PartialEq, Eq)]
enum Form {
    Single(PathBuf),
    Channel { count: u64, a: String, b: String },
    Peers { count: u64, csv: PathBuf },
}

impl Form {
    fn from_args(rest: &[String]) -> PadxResult<Self> {
        match rest {
            [path] => Ok(Form::Single(PathBuf::from(path))),
            [count, csv] => Ok(Form::Peers {
                count: parse_count(count)?,
                csv: PathBuf::from(csv),
            }),
            [count, a, b] => Ok(Form::Channel {
                count: parse_count(count)?,
                a: a.clone(),
                b: b.clone(),
            }),
            _ => Err(PadxError::Usage("expected 2, 3 or 4 arguments".into())),
        }
    }
}

/// Pad size in bytes, rejecting sizes that do not fit in a `u64`.
fn pad_bytes(size_kib: u64) -> PadxResult<u64> {
    size_kib
        .checked_mul(KIB)
        .ok_or_else(|| PadxError::Usage(format!("pad size {size_kib} KiB is too large")))
}

fn parse_count(s: &str) -> PadxResult<u64> {
    s.parse()
        .map_err(|_| PadxError::Usage(format!("invalid pad count {s:?}")))
}

fn main() -> ExitCode {
    let cli = match parse_args::<Cli>() {
        Ok(cli) => cli,
        Err(code) => return code,
    };
    finish::<Cli>(TOOL, run(&cli))
}

fn run(cli: &Cli) -> PadxResult<String> {
    let form = Form::from_args(&cli.rest)?;
    let size_bytes = pad_bytes(cli.size_kib)?;
    let mut config = bootstrap(TOOL, &cli.common)?;
    config.apply_env();

    let sources = EntropySource::open_all(&config.entropy)?;
    let mixer = EntropyMixer::new(sources)?;
    let mut generator = Generator::new(mixer, &config.pads);

    match form {
        Form::Single(path) => {
            generator.generate_pad(cli.size_kib, &path)?;
            Ok(format!(
                "`{}` generated ({size_bytes} bytes).",
                path.display()
            ))
        }
        Form::Channel { count, a, b } => {
            let pairs =
                generator.generate_channel(&cli.out_dir, &a, &b, cli.size_kib, count, |_| {})?;
            Ok(summary(pairs, size_bytes, &cli.out_dir))
        }
        Form::Peers { count, csv } => {
            let text = std::fs::read_to_string(&csv)
                .with_context(|| format!("reading peers file {}", csv.display()))?;
            let rows = parse_peers_csv(&text)?;
            let pairs =
                generator.generate_from_edges(&cli.out_dir, &rows, cli.size_kib, count, |_| {})?;
            Ok(summary(pairs, size_bytes, &cli.out_dir))
        }
    }
}

fn summary(pairs: u64, size_bytes: u64, root: &Path) -> String {
    format!(
        "{pairs} pad pair(s) of {size_bytes} bytes generated under `{}`.",
        root.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn forms_by_arity() {
        assert_eq!(
            Form::from_args(&args(&["solo.w.pad"])).unwrap(),
            Form::Single(PathBuf::from("solo.w.pad"))
        );
        assert_eq!(
            Form::from_args(&args(&["3", "peers.csv"])).unwrap(),
            Form::Peers {
                count: 3,
                csv: PathBuf::from("peers.csv")
            }
        );
        assert_eq!(
            Form::from_args(&args(&["2", "Alice", "Bob"])).unwrap(),
            Form::Channel {
                count: 2,
                a: "Alice".into(),
                b: "Bob".into()
            }
        );
    }

    #[test]
    fn bad_count_is_usage_error() {
        let err = Form::from_args(&args(&["many", "Alice", "Bob"])).unwrap_err();
        assert!(matches!(err, PadxError::Usage(_)));
    }

    #[test]
    fn cli_rejects_too_many_args() {
        assert!(Cli::try_parse_from(["padx-gen", "1", "2", "a", "b", "c"]).is_err());
        assert!(Cli::try_parse_from(["padx-gen", "1"]).is_err());
        assert!(Cli::try_parse_from(["padx-gen", "x", "pad.w.pad"]).is_err());
    }

    #[test]
    fn oversized_pad_is_usage_error() {
        assert_eq!(pad_bytes(3).unwrap(), 3 * KIB);
        assert!(matches!(pad_bytes(u64::MAX / KIB + 1), Err(PadxError::Usage(_))));

        let size = u64::MAX.to_string();
        let cli = Cli::try_parse_from(["padx-gen", size.as_str(), "huge.w.pad"]).unwrap();
        let err = run(&cli).unwrap_err();
        assert!(matches!(err, PadxError::Usage(_)));
        assert_eq!(err.exit_code(), 9);
    }

    #[test]
    fn summary_counts_pairs() {
        assert_eq!(
            summary(4, 2048, Path::new("out")),
            "4 pad pair(s) of 2048 bytes generated under `out`."
        );
    }

    #[test]
    fn out_dir_defaults_to_cwd() {
        let cli = Cli::try_parse_from(["padx-gen", "1", "2", "Alice", "Bob"]).unwrap();
        assert_eq!(cli.out_dir, PathBuf::from("."));
        assert_eq!(cli.size_kib, 1);
    }
}
