//! Text rendering of the selected record.

use crate::record::{FileRecord, RecordStatus};
use crate::state::{Banner, UploadState};
use serde_json::Value;
use std::fmt::Write;

/// How structured data is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ViewMode {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// One `path: value` line per leaf.
    Tree,
}

/// Render the currently selected record of `state`.
pub fn render_selected(state: &UploadState, mode: ViewMode) -> String {
    match state.selected_record() {
        Some(record) => render_record(record, mode),
        None => "No file selected.\n".to_string(),
    }
}

/// Render one record: its data or error, followed by the prompt when known.
pub fn render_record(record: &FileRecord, mode: ViewMode) -> String {
    let mut out = format!("== {} ==\n", record.file_name);
    match &record.status {
        RecordStatus::Loading => {
            out.push_str("Processing...\n");
        }
        RecordStatus::Done { data: Some(data) } => {
            out.push_str(&render_value(data, mode));
        }
        RecordStatus::Done { data: None } => {
            out.push_str("No data returned.\n");
        }
        RecordStatus::Failed { error, raw } => {
            let _ = writeln!(out, "Error: {}", error);
            if let Some(raw) = raw {
                let _ = write!(out, "\nRaw output:\n{}\n", raw);
            }
        }
    }
    if let Some(prompt) = &record.prompt_text {
        let _ = write!(out, "\nPrompt:\n{}\n", prompt);
    }
    out
}

pub fn render_banner(banner: &Banner) -> String {
    match banner {
        Banner::Success(message) => format!("[ok] {}", message),
        Banner::Error(message) => format!("[error] {}", message),
    }
}

/// One-line status per record, newest last.
pub fn render_summary(state: &UploadState) -> String {
    let mut out = String::new();
    for record in &state.records {
        let marker = if state.selected.as_deref() == Some(record.id.as_str()) {
            '>'
        } else {
            ' '
        };
        let status = match &record.status {
            RecordStatus::Loading => "loading".to_string(),
            RecordStatus::Done { data: Some(_) } => "done".to_string(),
            RecordStatus::Done { data: None } => "no data".to_string(),
            RecordStatus::Failed { error, .. } => format!("failed: {}", error),
        };
        let _ = writeln!(out, "{} {} [{}]", marker, record.file_name, status);
    }
    out
}

pub fn render_value(value: &Value, mode: ViewMode) -> String {
    match mode {
        ViewMode::Json => {
            let mut text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            text.push('\n');
            text
        }
        ViewMode::Tree => {
            let mut out = String::new();
            write_tree(&mut out, "", value);
            out
        }
    }
}

fn write_tree(out: &mut String, path: &str, value: &Value) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                write_tree(out, &child_path, child);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                write_tree(out, &format!("{}[{}]", path, i), child);
            }
        }
        leaf => {
            let label = if path.is_empty() { "." } else { path };
            let _ = writeln!(out, "{}: {}", label, leaf);
        }
    }
}
