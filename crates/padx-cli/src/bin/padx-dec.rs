//! padx-dec: authenticate and decrypt a `.enc` file
//!
//! Usage:
//!   padx-dec <ciphertext.enc> <pad.r.pad | pad-dir>
//!
//! When given a directory, every `.r.pad` directly inside it is tried.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use padx_cli::{bootstrap, finish, parse_args, CommonArgs};
use padx_core::PadxResult;
use padx_crypto::{decrypt_file, DecryptOptions};

const TOOL: &str = "padx-dec";

#[derive(Parser, Debug)]
#[command(
    name = "padx-dec",
    version,
    about = "Authenticate and decrypt a file encrypted with a one-time pad",
    after_help = "Exit status: 0 success, 1 invalid pad or no valid pad in the directory, 9 other error"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// The file to decrypt (a .enc file)
    ciphertext: PathBuf,

    /// The pad (a .r.pad file) or a directory containing it
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
    let opts = DecryptOptions::new(&cli.ciphertext, &cli.pad).buffer_size(config.io.buffer_size);
    let report = decrypt_file(&opts)?;
    Ok(format!(
        "`{}` successfully authenticated and decrypted using `{}`.",
        cli.ciphertext.display(),
        report.pad.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use padx_core::PadxError;

    #[test]
    fn requires_both_paths() {
        assert!(Cli::try_parse_from(["padx-dec", "m.enc"]).is_err());
        assert!(Cli::try_parse_from(["padx-dec", "m.enc", "pads/"]).is_ok());
    }

    #[test]
    fn garbage_ciphertext_finds_no_pad() {
        let dir = tempfile::TempDir::new().unwrap();
        let ct = dir.path().join("m.enc");
        let pad = dir.path().join("p.r.pad");
        std::fs::write(&ct, vec![1u8; 200]).unwrap();
        std::fs::write(&pad, vec![2u8; 400]).unwrap();

        let cli = Cli::try_parse_from([
            "padx-dec".into(),
            ct.into_os_string(),
            dir.path().as_os_str().to_os_string(),
        ])
        .unwrap();
        let err = run(&cli).unwrap_err();
        assert!(matches!(err, PadxError::NoValidPad(_)));
        assert_eq!(err.exit_code(), 1);
        assert!(!dir.path().join("m").exists());
    }
}
