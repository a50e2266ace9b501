//! Client upload state and its transitions.
//!
//! [`UploadState`] is treated as an immutable value. Every transition borrows
//! the current value and returns the next one, and [`StateHandle`] swaps the
//! result in whole, so readers never observe a half-applied event.

use crate::record::{Batch, FileRecord, RecordStatus};
use std::sync::{Arc, RwLock};
use tracing::debug;

pub const ALL_PROCESSED_MESSAGE: &str = "All files processed successfully.";
pub const STREAM_ENDED_MESSAGE: &str = "File stream ended.";
pub const UNPARSEABLE_EVENT_MESSAGE: &str = "Failed to parse server event.";

/// One-shot status line shown above the results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    Success(String),
    Error(String),
}

/// Outcome of one file as reported by the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Data(Option<serde_json::Value>),
    Failed { error: String, raw: Option<String> },
}

/// Whole client-side state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadState {
    pub records: Vec<FileRecord>,
    pub selected: Option<String>,
    pub banner: Option<Banner>,
    pub uploading: bool,
}

impl UploadState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, id: &str) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn selected_record(&self) -> Option<&FileRecord> {
        self.selected.as_deref().and_then(|id| self.record(id))
    }

    pub fn select(&self, id: &str) -> Self {
        Self {
            selected: self.record(id).map(|r| r.id.clone()),
            ..self.clone()
        }
    }

    /// Select the newest record named `file_name`, if any.
    pub fn select_file(&self, file_name: &str) -> Self {
        match self.records.iter().rev().find(|r| r.file_name == file_name) {
            Some(record) => self.select(&record.id),
            None => self.clone(),
        }
    }

    /// Report a rejected selection; nothing else changes.
    pub fn reject(&self, message: impl Into<String>) -> Self {
        Self {
            banner: Some(Banner::Error(message.into())),
            ..self.clone()
        }
    }

    /// Start a batch: clear banners, drop still-loading records the batch
    /// supersedes, append the placeholders, and keep only the newest `retention`.
    pub fn seed_batch(&self, batch: &Batch, placeholders: &[FileRecord], retention: usize) -> Self {
        let mut records: Vec<FileRecord> = self
            .records
            .iter()
            .filter(|r| !(r.is_loading() && batch.has_file(&r.file_name)))
            .cloned()
            .collect();
        records.extend(placeholders.iter().cloned());
        if records.len() > retention {
            records.drain(..records.len() - retention);
        }

        let selected = self
            .selected
            .clone()
            .filter(|id| records.iter().any(|r| &r.id == id));

        Self {
            records,
            selected,
            banner: None,
            uploading: true,
        }
    }

    /// Apply a per-file event to the batch records carrying `file_name`.
    pub fn apply_file_outcome(
        &self,
        batch: &Batch,
        file_name: &str,
        outcome: &FileOutcome,
        prompt: Option<&str>,
    ) -> Self {
        let mut selected = self.selected.clone();
        let records = self
            .records
            .iter()
            .map(|r| {
                if !batch.contains(r) || r.file_name != file_name {
                    return r.clone();
                }
                let status = match outcome {
                    FileOutcome::Data(data) => {
                        if selected.is_none() && data.is_some() {
                            debug!("Auto-selecting {} ({})", r.file_name, r.id);
                            selected = Some(r.id.clone());
                        }
                        RecordStatus::Done { data: data.clone() }
                    }
                    FileOutcome::Failed { error, raw } => RecordStatus::Failed {
                        error: error.clone(),
                        raw: raw.clone(),
                    },
                };
                FileRecord {
                    prompt_text: prompt.map(str::to_string).or_else(|| r.prompt_text.clone()),
                    ..r.with_status(status)
                }
            })
            .collect();

        Self {
            records,
            selected,
            ..self.clone()
        }
    }

    /// An event that could not be parsed fails the loading batch records it mentions.
    pub fn apply_unparseable_event(&self, batch: &Batch, raw: &str) -> Self {
        self.map_batch(batch, |r| {
            if r.is_loading() && raw.contains(r.file_name.as_str()) {
                r.with_status(RecordStatus::Failed {
                    error: UNPARSEABLE_EVENT_MESSAGE.to_string(),
                    raw: None,
                })
            } else {
                r.clone()
            }
        })
    }

    /// The server finished every file.
    pub fn apply_complete(&self, batch: &Batch) -> Self {
        Self {
            banner: Some(Banner::Success(ALL_PROCESSED_MESSAGE.to_string())),
            uploading: false,
            ..self.settle_loading(batch)
        }
    }

    /// The transport ended. Anything still loading is settled.
    pub fn end_stream(&self, batch: &Batch) -> Self {
        let next = self.settle_loading(batch);
        Self {
            banner: next
                .banner
                .clone()
                .or_else(|| Some(Banner::Success(STREAM_ENDED_MESSAGE.to_string()))),
            uploading: false,
            ..next
        }
    }

    /// The transport failed. Every batch record carries the message.
    pub fn fail_batch(&self, batch: &Batch, message: &str) -> Self {
        let next = self.map_batch(batch, |r| {
            r.with_status(RecordStatus::Failed {
                error: message.to_string(),
                raw: None,
            })
        });
        Self {
            banner: Some(Banner::Error(message.to_string())),
            uploading: false,
            ..next
        }
    }

    fn settle_loading(&self, batch: &Batch) -> Self {
        self.map_batch(batch, |r| {
            if r.is_loading() {
                r.with_status(RecordStatus::Done { data: None })
            } else {
                r.clone()
            }
        })
    }

    fn map_batch(&self, batch: &Batch, f: impl Fn(&FileRecord) -> FileRecord) -> Self {
        Self {
            records: self
                .records
                .iter()
                .map(|r| if batch.contains(r) { f(r) } else { r.clone() })
                .collect(),
            ..self.clone()
        }
    }
}

/// Shared slot holding the current [`UploadState`].
#[derive(Debug, Clone, Default)]
pub struct StateHandle {
    inner: Arc<RwLock<Arc<UploadState>>>,
}

impl StateHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: UploadState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(state))),
        }
    }

    /// Current value. Later updates do not affect the returned snapshot.
    pub fn snapshot(&self) -> Arc<UploadState> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the value with `f(current)`.
    ///
    /// `f` runs under the write lock, so concurrent updates apply in sequence.
    pub fn update(&self, f: impl FnOnce(&UploadState) -> UploadState) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let next = Arc::new(f(&guard));
        *guard = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded(names: &[&str]) -> (UploadState, Batch) {
        let (batch, placeholders) = Batch::from_selection(names.iter().copied(), None);
        let state = UploadState::new().seed_batch(&batch, &placeholders, 30);
        (state, batch)
    }

    #[test]
    fn test_seed_clears_banner_and_marks_uploading() {
        let state = UploadState::new().reject("too many");
        let (batch, placeholders) = Batch::from_selection(["a.pdf"], None);
        let next = state.seed_batch(&batch, &placeholders, 30);
        assert_eq!(next.banner, None);
        assert!(next.uploading);
        assert_eq!(next.records.len(), 1);
        assert!(next.records[0].is_loading());
    }

    #[test]
    fn test_seed_supersedes_loading_record_of_same_name() {
        let (state, _) = seeded(&["a.pdf", "b.pdf"]);
        let (batch, placeholders) = Batch::from_selection(["a.pdf"], None);
        let next = state.seed_batch(&batch, &placeholders, 30);

        let names: Vec<&str> = next.records.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["b.pdf", "a.pdf"]);
        assert!(batch.contains(&next.records[1]));
    }

    #[test]
    fn test_seed_keeps_finished_record_of_same_name() {
        let (state, batch) = seeded(&["a.pdf"]);
        let state = state.apply_complete(&batch);
        let (batch2, placeholders) = Batch::from_selection(["a.pdf"], None);
        let next = state.seed_batch(&batch2, &placeholders, 30);
        assert_eq!(next.records.len(), 2);
    }

    #[test]
    fn test_seed_applies_retention() {
        let mut state = UploadState::new();
        for i in 0..5 {
            let (batch, placeholders) = Batch::from_selection([format!("{i}.txt")], None);
            state = state.seed_batch(&batch, &placeholders, 3).apply_complete(&batch);
        }
        let names: Vec<&str> = state.records.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["2.txt", "3.txt", "4.txt"]);
    }

    #[test]
    fn test_file_outcome_updates_only_batch_records() {
        let (state, old_batch) = seeded(&["a.pdf"]);
        let state = state.apply_complete(&old_batch);
        let (batch, placeholders) = Batch::from_selection(["a.pdf"], None);
        let state = state.seed_batch(&batch, &placeholders, 30);

        let next = state.apply_file_outcome(
            &batch,
            "a.pdf",
            &FileOutcome::Data(Some(json!({"a": 1}))),
            Some("Extract totals"),
        );

        assert_eq!(next.records[0].json_data(), None);
        assert_eq!(next.records[1].json_data(), Some(&json!({"a": 1})));
        assert_eq!(next.records[1].prompt_text.as_deref(), Some("Extract totals"));
        assert_eq!(next.selected.as_deref(), Some(next.records[1].id.as_str()));
    }

    #[test]
    fn test_failed_outcome_does_not_auto_select() {
        let (state, batch) = seeded(&["a.pdf"]);
        let next = state.apply_file_outcome(
            &batch,
            "a.pdf",
            &FileOutcome::Failed {
                error: "bad".to_string(),
                raw: Some("raw".to_string()),
            },
            None,
        );
        assert_eq!(next.selected, None);
        assert_eq!(next.records[0].error(), Some("bad"));
    }

    #[test]
    fn test_complete_settles_loading_and_keeps_results() {
        let (state, batch) = seeded(&["a.pdf", "b.pdf"]);
        let state =
            state.apply_file_outcome(&batch, "a.pdf", &FileOutcome::Data(Some(json!(1))), None);
        let next = state.apply_complete(&batch);

        assert!(next.records.iter().all(|r| !r.is_loading()));
        assert_eq!(next.records[0].json_data(), Some(&json!(1)));
        assert_eq!(
            next.banner,
            Some(Banner::Success(ALL_PROCESSED_MESSAGE.to_string()))
        );
        assert!(!next.uploading);
    }

    #[test]
    fn test_end_stream_keeps_existing_banner() {
        let (state, batch) = seeded(&["a.pdf"]);
        let next = state.apply_complete(&batch).end_stream(&batch);
        assert_eq!(
            next.banner,
            Some(Banner::Success(ALL_PROCESSED_MESSAGE.to_string()))
        );

        let (state, batch) = seeded(&["a.pdf"]);
        let next = state.end_stream(&batch);
        assert_eq!(
            next.banner,
            Some(Banner::Success(STREAM_ENDED_MESSAGE.to_string()))
        );
        assert!(!next.records[0].is_loading());
    }

    #[test]
    fn test_fail_batch() {
        let (state, batch) = seeded(&["a.pdf", "b.pdf"]);
        let next = state.fail_batch(&batch, "Initial request failed: 500");
        assert!(next
            .records
            .iter()
            .all(|r| r.error() == Some("Initial request failed: 500")));
        assert_eq!(
            next.banner,
            Some(Banner::Error("Initial request failed: 500".to_string()))
        );
    }

    #[test]
    fn test_unparseable_event_scoped_to_named_record() {
        let (state, batch) = seeded(&["a.pdf", "b.pdf"]);
        let next = state.apply_unparseable_event(&batch, r#"{"fileName": "a.pdf", oops"#);
        assert_eq!(next.records[0].error(), Some(UNPARSEABLE_EVENT_MESSAGE));
        assert!(next.records[1].is_loading());
    }

    #[test]
    fn test_select_ignores_unknown_id() {
        let (state, _) = seeded(&["a.pdf", "b.pdf"]);
        let id = state.records[1].id.clone();
        let state = state.select(&id);
        assert_eq!(state.selected_record().map(|r| r.file_name.as_str()), Some("b.pdf"));
        assert_eq!(state.select("file_missing").selected, None);
    }

    #[test]
    fn test_select_file_picks_newest() {
        let (state, batch) = seeded(&["a.pdf", "b.pdf"]);
        let state = state.apply_complete(&batch);
        let (batch2, placeholders) = Batch::from_selection(["a.pdf"], None);
        let state = state.seed_batch(&batch2, &placeholders, 30);

        let next = state.select_file("a.pdf");
        assert_eq!(next.selected.as_deref(), Some(state.records[2].id.as_str()));
        assert_eq!(next.select_file("missing.pdf").selected, next.selected);
    }

    #[test]
    fn test_handle_swaps_whole_value() {
        let handle = StateHandle::new();
        let before = handle.snapshot();
        handle.update(|s| s.reject("nope"));
        assert_eq!(before.banner, None);
        assert_eq!(
            handle.snapshot().banner,
            Some(Banner::Error("nope".to_string()))
        );
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let handle = StateHandle::new();
        let workers: Vec<_> = (0..8)
            .map(|t| {
                let handle = handle.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let (batch, placeholders) =
                            Batch::from_selection([format!("{t}-{i}.txt")], None);
                        handle.update(|s| s.seed_batch(&batch, &placeholders, usize::MAX));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(handle.snapshot().records.len(), 1600);
    }
}
