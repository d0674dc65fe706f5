mod config;
mod escalation;
mod observer;
mod poll;
mod signals;

use clap::error::ErrorKind;
use clap::Parser;
use config::{ConfigError, LogLevel, Settings, SmartKillConfig};
use escalation::Escalator;
use nix::unistd::Pid;
use observer::SystemObserver;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit code for malformed invocations and configuration errors.
const USAGE_EXIT_CODE: u8 = 2;

const EXIT_CODES_HELP: &str = "\
EXIT CODES:
    0  the process PID does not exist any more
       (stopped, or did not exist at program start)
    1  the process PID is still here after this program stopped
    2  command-line or configuration error";

/// Sends a signal to a process and waits for it to stop up to a certain
/// length of time before sending a SIGKILL if necessary.
#[derive(Parser, Debug)]
#[command(name = "smart-kill", version, about, after_help = EXIT_CODES_HELP)]
pub struct Cli {
    /// Id of the process to stop
    #[arg(value_name = "PROCESS_PID", value_parser = clap::value_parser!(i32).range(1..))]
    pid: i32,

    /// Signal to send (as integer) to the process (15 for SIGTERM, 2 for SIGINT, 3 for SIGQUIT...) [default: 15]
    #[arg(long, value_name = "SIGNAL", allow_negative_numbers = true)]
    signal: Option<i32>,

    /// Maximum number of milliseconds to wait after sending the signal; negative means 0 [default: 5000]
    #[arg(long, value_name = "MS", allow_negative_numbers = true)]
    wait_ms: Option<i64>,

    /// Log level [default: INFO]
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    /// Config file path (TOML); command-line flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// Merge the optional config file, the flags and the defaults.
    fn settings(&self) -> Result<Settings, ConfigError> {
        let config = match &self.config {
            Some(path) => SmartKillConfig::load(path)?,
            None => SmartKillConfig::default(),
        };
        Ok(config
            .with_overrides(self.signal, self.wait_ms, self.log_level)
            .resolve())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = parse_error_exit_code(&err);
            if code == USAGE_EXIT_CODE {
                eprintln!("ERROR: {}", usage_message(&err));
            } else {
                let _ = err.print();
            }
            return ExitCode::from(code);
        }
    };

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("ERROR: {err}");
            return ExitCode::from(USAGE_EXIT_CODE);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(settings.log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_ansi(std::io::stdout().is_terminal())
        .init();

    tracing::debug!(?cli, ?settings, "resolved settings");

    let outcome = Escalator::new(
        SystemObserver,
        Pid::from_raw(cli.pid),
        settings.primary_signal,
        settings.grace,
    )
    .run()
    .await;

    ExitCode::from(outcome.exit_code())
}

/// Help and version requests succeed; everything else is a usage error.
fn parse_error_exit_code(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => USAGE_EXIT_CODE,
    }
}

/// clap's rendered error without its own `error: ` prefix.
fn usage_message(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .trim_start_matches("error: ")
        .trim_end()
        .to_string()
}
