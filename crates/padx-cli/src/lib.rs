//! Shared plumbing for the padx binaries: common flags, logging setup,
//! config loading, and the exit-status contract.
//!
//! Every tool prints exactly one line on completion:
//! `<tool>: success: ...` on stdout, or `<tool>: error: ...` on stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, CommandFactory, Parser, ValueEnum};

use padx_core::{PadxConfig, PadxError, PadxResult, EXIT_ERROR, EXIT_SUCCESS};

/// Flags accepted by every padx tool.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Path to a padx.toml configuration file
    #[arg(long, short = 'c', env = "PADX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level or filter directive (trace, debug, info, warn, error)
    #[arg(long, env = "PADX_LOG")]
    pub log: Option<String>,

    /// Log format (json, text)
    #[arg(long, env = "PADX_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    fn from_config(format: &str) -> Self {
        match format {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Parse arguments, mapping clap failures onto the padx exit codes.
///
/// `--help` and `--version` exit 0; any malformed invocation prints usage
/// and exits 9.
pub fn parse_args<T: Parser>() -> Result<T, ExitCode> {
    T::try_parse().map_err(|e| {
        let _ = e.print();
        if e.use_stderr() {
            exit_code(EXIT_ERROR)
        } else {
            exit_code(EXIT_SUCCESS)
        }
    })
}

/// Load the config, apply flag overrides, and start logging.
pub fn bootstrap(tool: &str, common: &CommonArgs) -> PadxResult<PadxConfig> {
    let config = match &common.config {
        Some(path) => PadxConfig::load(path)?,
        None => PadxConfig::default(),
    };
    config.validate()?;

    let level = common
        .log
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let format = common
        .log_format
        .unwrap_or_else(|| LogFormat::from_config(&config.logging.format));
    init_logging(&level, format);

    tracing::debug!(
        tool,
        version = env!("CARGO_PKG_VERSION"),
        config = ?common.config,
        buffer_size = config.io.buffer_size,
        "starting"
    );
    Ok(config)
}

/// Logs go to stderr so stdout carries only the result line.
pub fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));

    let result = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("logging already initialized: {e}");
    }
}

/// Report the outcome of a tool run and turn it into a process exit code.
///
/// Usage errors also print the tool's usage line.
pub fn finish<C: CommandFactory>(tool: &str, result: PadxResult<String>) -> ExitCode {
    match result {
        Ok(message) => {
            println!("{tool}: success: {message}");
            exit_code(EXIT_SUCCESS)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "run failed");
            eprintln!("{}", error_line(tool, &e));
            if matches!(e, PadxError::Usage(_)) {
                eprintln!("{}", C::command().render_usage());
            }
            exit_code(e.exit_code())
        }
    }
}

pub fn error_line(tool: &str, err: &PadxError) -> String {
    format!("{tool}: error: {err}")
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX))
}
