use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use uibridge_session::Command;
use uibridge_stream::EngineEvent;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct CommandOutput<'a> {
    peer: &'a str,
    #[serde(flatten)]
    command: &'a Command,
    timestamp: String,
}

#[derive(Serialize)]
struct EventOutput<'a> {
    #[serde(flatten)]
    event: &'a EngineEvent,
    timestamp: String,
}

/// Print a command received from `peer` (`host` or `ui`).
pub fn print_command(command: &Command, peer: &str, format: OutputFormat) {
    println!("{}", render_command(command, peer, format));
}

pub fn print_event(event: &EngineEvent, format: OutputFormat) {
    println!("{}", render_event(event, format));
}

fn render_command(command: &Command, peer: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&CommandOutput {
            peer,
            command,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            let text = command.to_string();
            let args = text
                .split_once(' ')
                .map(|(_, args)| args.to_string())
                .unwrap_or_default();
            table(
                vec!["PEER", "KEYWORD", "ARGUMENTS"],
                vec![peer.to_string(), command.keyword().to_string(), args],
            )
        }
        OutputFormat::Pretty => format!("{peer}: {command}"),
    }
}

fn render_event(event: &EngineEvent, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&EventOutput {
            event,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => table(
            vec!["ACTION", "PLUGIN", "VALUE1", "VALUE2", "VALUE3", "VALUE STR"],
            vec![
                event.action.to_string(),
                event.plugin_id.to_string(),
                event.value1.to_string(),
                event.value2.to_string(),
                event.value3.to_string(),
                event.value_str.clone(),
            ],
        ),
        OutputFormat::Pretty => format!(
            "action={} plugin={} values=({}, {}, {}) str={:?}",
            event.action, event.plugin_id, event.value1, event.value2, event.value3, event.value_str
        ),
    }
}

fn table(header: Vec<&str>, row: Vec<String>) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header)
        .add_row(row);
    table.to_string()
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
