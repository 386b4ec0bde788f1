use std::process::{Child, Command as Process};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use uibridge_session::{host_pipes, Command, PipeSession, SessionConfig, SessionListener};

use crate::cmd::{install_ctrlc_handler, parse_commands, parse_duration, HostArgs, Printer};
use crate::exit::{io_error, session_error, transport_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::OutputFormat;

const POLL_PERIOD: Duration = Duration::from_millis(30);
const CHILD_EXIT_GRACE: Duration = Duration::from_secs(3);

pub fn run(args: HostArgs, format: OutputFormat) -> CliResult<i32> {
    let commands = parse_commands(&args.commands)?;
    let linger = parse_duration(&args.linger)?;
    let ready_timeout = parse_duration(&args.ready_timeout)?;
    if ready_timeout.is_zero() {
        return Err(CliError::new(USAGE, "ready timeout must be greater than zero"));
    }
    let config = SessionConfig {
        ready_timeout,
        ..SessionConfig::default()
    };
    let running = install_ctrlc_handler()?;

    let (mut session, mut child) = match &args.path {
        Some(path) => {
            let listener = SessionListener::bind(path)
                .map_err(|err| session_error("bind failed", err))?
                .with_config(config);
            info!(path = %path.display(), "waiting for a UI");
            let session = listener
                .accept()
                .map_err(|err| session_error("UI handshake failed", err))?;
            (session, None)
        }
        None => {
            let (session, child) = spawn_ui(&args.spawn, config)?;
            (session, Some(child))
        }
    };
    info!("UI is ready");

    for command in &commands {
        session
            .send(command)
            .map_err(|err| session_error("send failed", err))?;
    }

    let mut printer = Printer::new("ui", format);
    let deadline = Instant::now() + linger;
    let mut ui_open = true;
    while running.load(Ordering::SeqCst) && Instant::now() < deadline {
        if !session.idle(&mut printer) {
            ui_open = false;
            break;
        }
        thread::sleep(POLL_PERIOD);
    }

    let mut quit_sent = false;
    if args.quit && ui_open {
        match session.send(&Command::Quit) {
            Ok(()) => quit_sent = true,
            Err(err) => warn!(error = %err, "could not send quit"),
        }
    }
    session
        .close()
        .map_err(|err| session_error("close failed", err))?;
    drop(session);

    match child.as_mut() {
        Some(child) => finish_child(child, quit_sent),
        None => Ok(SUCCESS),
    }
}

/// Start the UI program over inherited pipes and wait for it to announce itself.
fn spawn_ui(argv: &[String], config: SessionConfig) -> CliResult<(PipeSession, Child)> {
    let Some((program, rest)) = argv.split_first() else {
        return Err(CliError::new(USAGE, "give a socket path or a UI program after --"));
    };

    let (mut session, pipes) = host_pipes(config).map_err(|err| session_error("pipe setup failed", err))?;
    pipes
        .make_inheritable()
        .map_err(|err| transport_error("pipe setup failed", err))?;
    let [recv_fd, send_fd] = pipes.fd_args();

    let mut child = Process::new(program)
        .args(rest)
        .arg("--recv-fd")
        .arg(&recv_fd)
        .arg("--send-fd")
        .arg(&send_fd)
        .spawn()
        .map_err(|err| io_error(&format!("failed to spawn {program}"), err))?;
    debug!(pid = child.id(), %recv_fd, %send_fd, "UI process started");
    drop(pipes);

    if let Err(err) = session.await_ready() {
        let _ = child.kill();
        let _ = child.wait();
        return Err(session_error("UI handshake failed", err));
    }
    Ok((session, child))
}

fn finish_child(child: &mut Child, quit_sent: bool) -> CliResult<i32> {
    let deadline = Instant::now() + CHILD_EXIT_GRACE;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() < deadline => thread::sleep(POLL_PERIOD),
            Ok(None) => {
                warn!(pid = child.id(), "UI did not exit; killing it");
                let _ = child.kill();
                let _ = child.wait();
                return Err(CliError::new(FAILURE, "UI did not exit after the session closed"));
            }
            Err(err) => return Err(io_error("waiting for UI failed", err)),
        }
    };

    debug!(%status, "UI process exited");
    if quit_sent && !status.success() {
        return Err(CliError::new(FAILURE, format!("UI exited with {status}")));
    }
    Ok(SUCCESS)
}
