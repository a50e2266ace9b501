//! Per-file client records and upload batches.

use serde_json::Value;
use std::collections::HashSet;
use uuid::Uuid;

/// Lifecycle of one uploaded file: `Loading` then `Done` or `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordStatus {
    Loading,
    /// Finished. `data` is `None` when the stream ended without a result for this file.
    Done { data: Option<Value> },
    /// `raw` keeps undecodable model output for display.
    Failed { error: String, raw: Option<String> },
}

/// Client-side state for one uploaded file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub id: String,
    pub file_name: String,
    pub prompt_text: Option<String>,
    pub status: RecordStatus,
}

impl FileRecord {
    /// A loading placeholder with a fresh id.
    pub fn placeholder(file_name: impl Into<String>, prompt_text: Option<String>) -> Self {
        Self {
            id: format!("file_{}", Uuid::new_v4().simple()),
            file_name: file_name.into(),
            prompt_text,
            status: RecordStatus::Loading,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, RecordStatus::Loading)
    }

    pub fn json_data(&self) -> Option<&Value> {
        match &self.status {
            RecordStatus::Done { data } => data.as_ref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            RecordStatus::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub(crate) fn with_status(&self, status: RecordStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

/// The records created by one upload action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    ids: HashSet<String>,
    file_names: Vec<String>,
}

impl Batch {
    /// Build placeholders for a selection. Repeated names collapse to one record.
    pub fn from_selection<I, S>(file_names: I, prompt_text: Option<&str>) -> (Self, Vec<FileRecord>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let records: Vec<FileRecord> = file_names
            .into_iter()
            .map(Into::<String>::into)
            .filter(|name| seen.insert(name.clone()))
            .map(|name| FileRecord::placeholder(name, prompt_text.map(str::to_string)))
            .collect();

        let batch = Self {
            ids: records.iter().map(|r| r.id.clone()).collect(),
            file_names: records.iter().map(|r| r.file_name.clone()).collect(),
        };
        (batch, records)
    }

    pub fn contains(&self, record: &FileRecord) -> bool {
        self.ids.contains(&record.id)
    }

    pub fn has_file(&self, file_name: &str) -> bool {
        self.file_names.iter().any(|n| n == file_name)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
