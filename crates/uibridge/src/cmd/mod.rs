use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use uibridge_session::{Command as UiCommand, UiHandler};

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::{print_command, OutputFormat};

pub mod host;
pub mod ui;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Act as a plugin UI and print what the host sends.
    Ui(UiArgs),
    /// Act as a plugin host: send commands to a UI and print its replies.
    Host(HostArgs),
    /// Follow an engine event stream and print its events.
    Watch(WatchArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ui(args) => ui::run(args, format),
        Command::Host(args) => host::run(args, format),
        Command::Watch(args) => watch::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct UiArgs {
    /// Host socket path to connect to.
    #[arg(required_unless_present = "recv_fd", conflicts_with = "recv_fd")]
    pub path: Option<PathBuf>,
    /// Inherited descriptor to read host messages from.
    #[arg(long, value_name = "FD", requires = "send_fd")]
    pub recv_fd: Option<String>,
    /// Inherited descriptor to write UI messages to.
    #[arg(long, value_name = "FD", requires = "recv_fd")]
    pub send_fd: Option<String>,
    /// Idle timer period in milliseconds.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub idle_ms: u64,
    /// Command to send after announcing readiness, e.g. "control 3 0.5".
    #[arg(long = "cmd", value_name = "COMMAND")]
    pub commands: Vec<String>,
}

#[derive(Args, Debug)]
pub struct HostArgs {
    /// Socket path to bind and wait for a UI on.
    #[arg(required_unless_present = "spawn", conflicts_with = "spawn")]
    pub path: Option<PathBuf>,
    /// Command to send once the UI is ready, e.g. "uiTitle My Synth".
    #[arg(long = "cmd", value_name = "COMMAND")]
    pub commands: Vec<String>,
    /// Keep printing UI messages this long after the last command (e.g. 2s, 500ms).
    #[arg(long, default_value = "1s")]
    pub linger: String,
    /// How long to wait for the UI's ready line.
    #[arg(long, default_value = "5s")]
    pub ready_timeout: String,
    /// Send `quit` before finishing.
    #[arg(long)]
    pub quit: bool,
    /// UI program to spawn over inherited pipes; `--recv-fd N --send-fd M` is appended.
    #[arg(last = true, value_name = "PROGRAM")]
    pub spawn: Vec<String>,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Event stream URL (http only).
    pub url: String,
    /// Exit after printing N events.
    #[arg(long)]
    pub count: Option<usize>,
    /// Idle timer period in milliseconds.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub idle_ms: u64,
    /// Give up after this many consecutive failed connection attempts.
    #[arg(long, default_value_t = 5)]
    pub max_failures: u32,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Prints every command the peer sends.
pub(crate) struct Printer {
    peer: &'static str,
    format: OutputFormat,
    pub(crate) printed: usize,
}

impl Printer {
    pub(crate) fn new(peer: &'static str, format: OutputFormat) -> Self {
        Self {
            peer,
            format,
            printed: 0,
        }
    }
}

impl UiHandler for Printer {
    fn on_command(&mut self, command: &UiCommand) {
        print_command(command, self.peer, self.format);
        self.printed += 1;
    }
}

pub(crate) fn parse_commands(texts: &[String]) -> CliResult<Vec<UiCommand>> {
    texts
        .iter()
        .map(|text| {
            UiCommand::parse_text(text)
                .map_err(|err| CliError::new(USAGE, format!("invalid command {text:?}: {err}")))
        })
        .collect()
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

pub(crate) fn install_ctrlc_handler() -> CliResult<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;
    Ok(running)
}
