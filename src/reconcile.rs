//! Folds an SSE byte stream into [`UploadState`](crate::state::UploadState).

use crate::decode::{data_error, decode_processed_data, DecodedPayload};
use crate::error::UploadError;
use crate::event::EventPayload;
use crate::record::Batch;
use crate::sse::{data_payload, SseDecoder};
use crate::state::{FileOutcome, StateHandle};
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Applies the events of one batch's stream to shared state.
pub struct Reconciler {
    batch: Batch,
    decoder: SseDecoder,
    state: StateHandle,
}

impl Reconciler {
    pub fn new(batch: Batch, state: StateHandle) -> Self {
        Self {
            batch,
            decoder: SseDecoder::new(),
            state,
        }
    }

    /// Read `stream` to the end, applying every complete event.
    ///
    /// A transport error fails the whole batch and stops reading.
    pub async fn consume<S, B, E>(&mut self, stream: S) -> Result<(), UploadError>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        let mut stream = std::pin::pin!(stream);
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => self.feed(bytes.as_ref()),
                Err(e) => {
                    let message = e.to_string();
                    warn!("SSE stream failed: {}", message);
                    self.fail(&message);
                    return Err(UploadError::Stream(message));
                }
            }
        }
        self.finish();
        Ok(())
    }

    /// Append one network chunk and process the blocks it completes.
    pub fn feed(&mut self, chunk: &[u8]) {
        for block in self.decoder.push(chunk) {
            for line in &block.lines {
                if let Some(payload) = data_payload(line) {
                    self.process_payload(payload);
                }
            }
        }
    }

    /// The transport ended cleanly.
    pub fn finish(&mut self) {
        if self.decoder.pending() > 0 {
            debug!(
                "Discarding {} bytes of unterminated SSE block",
                self.decoder.pending()
            );
        }
        info!("SSE stream ended for {} files", self.batch.len());
        let batch = &self.batch;
        self.state.update(|s| s.end_stream(batch));
    }

    /// The transport failed; every record of the batch carries `message`.
    pub fn fail(&mut self, message: &str) {
        let batch = &self.batch;
        self.state.update(|s| s.fail_batch(batch, message));
    }

    fn process_payload(&mut self, raw: &str) {
        let batch = &self.batch;
        let event: EventPayload = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!("Failed to parse SSE data JSON: {} (data: {})", e, raw);
                self.state.update(|s| s.apply_unparseable_event(batch, raw));
                return;
            }
        };

        if event.is_complete() {
            info!("Server reported processing complete");
            self.state.update(|s| s.apply_complete(batch));
            return;
        }

        let Some(file_name) = event.file_name.as_deref() else {
            warn!("Ignoring SSE event without fileName: {}", raw);
            return;
        };

        let outcome = file_outcome(&event);
        debug!("Event for {}: {:?}", file_name, outcome);
        self.state.update(|s| {
            s.apply_file_outcome(batch, file_name, &outcome, event.prompt.as_deref())
        });
    }
}

/// Interpret a per-file payload. A transported `error` wins over any data.
fn file_outcome(event: &EventPayload) -> FileOutcome {
    let decoded = event
        .processed_data
        .as_ref()
        .filter(|data| !is_blank(data))
        .map(|data| match data {
            Value::String(s) => decode_processed_data(s),
            other => DecodedPayload::Parsed(other.clone()),
        });

    let raw = match &decoded {
        Some(DecodedPayload::Unparsed { raw_data, .. }) => Some(raw_data.clone()),
        _ => None,
    };
    let data = decoded.map(|d| d.to_value());

    let error = event
        .error
        .clone()
        .filter(|e| !e.is_empty())
        .or_else(|| data.as_ref().and_then(data_error));

    match error {
        Some(error) => FileOutcome::Failed { error, raw },
        None => FileOutcome::Data(data),
    }
}

/// Empty strings, `null` and `false` carry no data.
fn is_blank(data: &Value) -> bool {
    matches!(data, Value::Null | Value::Bool(false)) || data.as_str().is_some_and(str::is_empty)
}
