//! SCPI console worker: send one command, optionally read the response.

use crate::instrument::{InstrumentTransport, TransportError};
use crate::models::{ComProtocol, Selection, Settings};
use crate::tasks::TaskKind;
use crate::ui::event_loop::UiHandle;
use std::sync::Arc;

/// Inputs for one send worker run, snapshotted at launch.
pub struct ScpiJob {
    pub ui: UiHandle,
    pub transport: Arc<dyn InstrumentTransport>,
    pub selection: Option<Selection>,
    pub command: String,
    pub settings: Settings,
}

/// A command ending in `?` expects a response.
pub fn is_query(command: &str) -> bool {
    command.trim_end().ends_with('?')
}

/// Build one SCPI log line with the configured `[timestamp ip REQ|RSP]`
/// prefix. Toggled-off parts are omitted entirely, brackets included.
pub fn format_log_line(
    settings: &Settings,
    text: &str,
    sent: bool,
    address: &str,
    timestamp: &str,
) -> String {
    let show_any = settings.scpi_show_message_timestamp
        || settings.scpi_show_message_ip
        || settings.scpi_show_message_type;

    let mut line = String::new();
    if show_any {
        line.push('[');
    }
    if settings.scpi_show_message_timestamp {
        line.push_str(timestamp);
    }
    if settings.scpi_show_message_ip {
        if settings.scpi_show_message_timestamp {
            line.push(' ');
        }
        line.push_str(address);
    }
    if settings.scpi_show_message_type {
        if settings.scpi_show_message_timestamp || settings.scpi_show_message_ip {
            line.push(' ');
        }
        line.push_str(if sent { "REQ" } else { "RSP" });
    }
    if show_any {
        line.push_str("] ");
    }
    line.push_str(text);
    line
}

fn timestamp_now() -> String {
    chrono::Local::now().format("%H:%M:%S%.3f").to_string()
}

fn report_error(ui: &UiHandle, error: TransportError) {
    let text = error.to_string();
    ui.post(move |state| state.show_error(text));
}

/// Send worker body.
pub fn run_send(job: ScpiJob) {
    send_inner(&job);
    job.ui.post(|state| state.task_finished(TaskKind::Send));
}

fn send_inner(job: &ScpiJob) {
    let Some(selection) = &job.selection else {
        job.ui.post(|state| state.show_error("No instrument selected"));
        return;
    };

    let command = job.command.trim_end().to_string();
    if command.is_empty() {
        job.ui.post(|state| state.show_error("Empty command"));
        return;
    }

    let settings = &job.settings;
    let timeout = settings.scpi_timeout();
    // Raw sockets are line-delimited; VXI-11 frames the payload itself.
    let (port, payload) = match settings.com_protocol {
        ComProtocol::Vxi11 => (0, command.clone()),
        ComProtocol::Raw => (settings.raw_port, format!("{command}\n")),
    };

    let mut connection = match job.transport.connect(
        &selection.address,
        port,
        timeout,
        settings.com_protocol,
    ) {
        Ok(connection) => connection,
        Err(e) => {
            tracing::warn!(address = %selection.address, "connect failed: {e}");
            report_error(&job.ui, TransportError::Connect);
            return;
        }
    };

    if let Err(e) = connection.send(payload.as_bytes(), timeout) {
        tracing::warn!("send failed: {e}");
        report_error(&job.ui, TransportError::Send);
        return;
    }

    if settings.show_sent_scpi {
        let line = format_log_line(settings, &command, true, &selection.address, &timestamp_now());
        job.ui.post(move |state| state.append_scpi_log(true, line));
    }

    if is_query(&command) {
        match connection.receive(timeout) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes).to_string();
                let line =
                    format_log_line(settings, &text, false, &selection.address, &timestamp_now());
                job.ui.post(move |state| state.append_scpi_log(false, line));
            }
            Err(e) => {
                tracing::warn!("receive failed: {e}");
                report_error(&job.ui, TransportError::Receive);
            }
        }
    }
    // The connection drops here, which disconnects.
}
