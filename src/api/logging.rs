use serde_json::Value;
use std::fs::OpenOptions;
use std::io::{IsTerminal, Write};

const DEFAULT_LOG_PATH: &str = "/tmp/workdeck-debug.log";
const DEBUG_REQUEST_ENV: &str = "WORKDECK_DEBUG_REQUESTS";
const LOG_PATH_ENV: &str = "WORKDECK_LOG_PATH";

pub fn debug_requests_enabled() -> bool {
    std::env::var(DEBUG_REQUEST_ENV).is_ok_and(|value| crate::util::flag_enabled(&value))
}

pub fn emit_debug_request(request_url: &str, payload: &Value) {
    let formatted_payload = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    let message =
        format!("WORKDECK DEBUG request url={request_url}\npayload:\n{formatted_payload}\n");
    emit_log_message(&message);
}

pub fn emit_event_decode_error(label: &str, data: &str, decode_error: &serde_json::Error) {
    let message = format!(
        "WORKDECK ERROR sse_decode_failed error={decode_error}\nevent_label={label}\ndata:\n{data}\n"
    );
    emit_log_message(&message);
}

fn emit_log_message(message: &str) {
    if let Some(path) = resolve_log_path() {
        if append_log_file(&path, message).is_ok() {
            return;
        }
    }

    eprintln!("{message}");
}

fn resolve_log_path() -> Option<String> {
    std::env::var(LOG_PATH_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            if std::io::stderr().is_terminal() {
                Some(DEFAULT_LOG_PATH.to_string())
            } else {
                None
            }
        })
}

fn append_log_file(path: &str, message: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(message.as_bytes())
}
