use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};
use uibridge_session::{connect_with_config, from_fd_args, PipeSession, SessionConfig};

use crate::cmd::{install_ctrlc_handler, parse_commands, Printer, UiArgs};
use crate::exit::{session_error, CliError, CliResult, SUCCESS, TRANSPORT_ERROR, USAGE};
use crate::output::OutputFormat;

pub fn run(args: UiArgs, format: OutputFormat) -> CliResult<i32> {
    let commands = parse_commands(&args.commands)?;
    let mut session = open(&args)?;
    let running = install_ctrlc_handler()?;

    for command in &commands {
        session
            .send(command)
            .map_err(|err| session_error("send failed", err))?;
    }

    let mut printer = Printer::new("host", format);
    let period = Duration::from_millis(args.idle_ms);
    while running.load(Ordering::SeqCst) {
        if !session.idle(&mut printer) {
            break;
        }
        thread::sleep(period);
    }

    if session.quit_received() {
        info!(received = printer.printed, "host asked the UI to quit");
        return Ok(SUCCESS);
    }
    if !running.load(Ordering::SeqCst) {
        info!("interrupted; closing");
        session
            .close()
            .map_err(|err| session_error("close failed", err))?;
        return Ok(SUCCESS);
    }

    warn!("host closed the channel without quit");
    Err(CliError::new(TRANSPORT_ERROR, "host closed the channel"))
}

fn open(args: &UiArgs) -> CliResult<PipeSession> {
    let config = SessionConfig::default();
    let opened = match (&args.path, &args.recv_fd, &args.send_fd) {
        (Some(path), None, None) => connect_with_config(path, config),
        (None, Some(recv), Some(send)) => from_fd_args(recv, send, config),
        _ => {
            return Err(CliError::new(
                USAGE,
                "give either a socket path or both --recv-fd and --send-fd",
            ))
        }
    };
    opened.map_err(|err| session_error("connect failed", err))
}
