use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};
use uibridge_stream::{EngineCallback, EngineEvent, HttpStreamConnector, StreamSupervisor};

use crate::cmd::{install_ctrlc_handler, WatchArgs};
use crate::exit::{stream_error, CliResult, SUCCESS};
use crate::output::{print_event, OutputFormat};

struct EventPrinter {
    format: OutputFormat,
    limit: Option<usize>,
    printed: usize,
}

impl EventPrinter {
    fn done(&self) -> bool {
        self.limit.is_some_and(|limit| self.printed >= limit)
    }
}

impl EngineCallback for EventPrinter {
    fn on_event(&mut self, event: &EngineEvent) {
        if self.done() {
            return;
        }
        print_event(event, self.format);
        self.printed += 1;
    }

    fn on_disconnect(&mut self) {
        debug!(printed = self.printed, "event stream lost");
    }
}

pub fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let connector =
        HttpStreamConnector::new(&args.url).map_err(|err| stream_error("watch failed", err))?;
    let mut supervisor = StreamSupervisor::new(connector);
    let running = install_ctrlc_handler()?;

    let mut printer = EventPrinter {
        format,
        limit: args.count,
        printed: 0,
    };
    let period = Duration::from_millis(args.idle_ms);
    let mut failures = 0u32;

    while running.load(Ordering::SeqCst) && !printer.done() {
        match supervisor.pump(&mut printer) {
            Ok(report) => {
                failures = 0;
                if report.lines > 0 {
                    debug!(?report, "stream batch");
                }
            }
            Err(err) => {
                failures += 1;
                if failures >= args.max_failures.max(1) {
                    return Err(stream_error("event stream failed", err));
                }
                warn!(error = %err, failures, "event stream unavailable; retrying");
            }
        }
        thread::sleep(period);
    }

    supervisor.disconnect();
    debug!(
        printed = printer.printed,
        reconnects = supervisor.reconnects(),
        "watch finished"
    );
    Ok(SUCCESS)
}
