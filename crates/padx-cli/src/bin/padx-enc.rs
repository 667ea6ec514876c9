//! padx-enc: encrypt a file with a one-time pad
//!
//! Usage:
//!   padx-enc [--short] <plaintext> <pad.w.pad>
//!
//! Writes `<plaintext>.enc` and renames the pad to `.x.pad`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use padx_cli::{bootstrap, finish, parse_args, CommonArgs};
use padx_core::PadxResult;
use padx_crypto::{encrypt_file, EncryptOptions, PaddingMode};

const TOOL: &str = "padx-enc";

#[derive(Parser, Debug)]
#[command(
    name = "padx-enc",
    version,
    about = "Encrypt a file with a one-time pad",
    after_help = "Exit status: 0 success, 1 pad is too short, 9 other error"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Do not pad the ciphertext; it will be shorter but leak the file size
    #[arg(long)]
    short: bool,

    /// The file to encrypt
    plaintext: PathBuf,

    /// The pad to use (a .w.pad file)
    pad: PathBuf,
}

fn main() -> ExitCode {
    let cli = match parse_args::<Cli>() {
        Ok(cli) => cli,
        Err(code) => return code,
    };
    finish::<Cli>(TOOL, run(&cli))
}

fn run(cli: &Cli) -> PadxResult<String> {
    let config = bootstrap(TOOL, &cli.common)?;
    let mode = if cli.short {
        PaddingMode::Short
    } else {
        PaddingMode::Long
    };

    let opts = EncryptOptions::new(&cli.plaintext, &cli.pad)
        .mode(mode)
        .buffer_size(config.io.buffer_size);
    let report = encrypt_file(&opts)?;
    tracing::debug!(
        ciphertext = %report.ciphertext.display(),
        ciphertext_size = report.ciphertext_size,
        "done"
    );

    Ok(format!(
        "`{}` successfully encrypted using `{}`.",
        cli.plaintext.display(),
        report.used_pad.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_flag() {
        let cli = Cli::try_parse_from(["padx-enc", "--short", "a.txt", "p.w.pad"]).unwrap();
        assert!(cli.short);
        let cli = Cli::try_parse_from(["padx-enc", "a.txt", "p.w.pad"]).unwrap();
        assert!(!cli.short);
    }

    #[test]
    fn requires_both_paths() {
        assert!(Cli::try_parse_from(["padx-enc", "a.txt"]).is_err());
    }

    #[test]
    fn encrypts_with_default_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let pt = dir.path().join("a.txt");
        let pad = dir.path().join("p.w.pad");
        std::fs::write(&pt, b"cli").unwrap();
        std::fs::write(&pad, vec![7u8; 300]).unwrap();

        let cli = Cli::try_parse_from([
            "padx-enc".into(),
            "--short".into(),
            pt.clone().into_os_string(),
            pad.clone().into_os_string(),
        ])
        .unwrap();
        let message = run(&cli).unwrap();
        assert!(message.contains("successfully encrypted"));
        assert!(message.contains("p.x.pad"), "{message}");
        assert!(!message.contains("p.w.pad"), "{message}");
        assert_eq!(std::fs::metadata(dir.path().join("a.txt.enc")).unwrap().len(), 99);
        assert!(dir.path().join("p.x.pad").exists());
    }
}
