//! Framing and decoding of the line-delimited phase event stream.
//!
//! The server writes one JSON object per line, usually prefixed with `data:`
//! in server-sent-events style. Every step accepts the canonical event kinds;
//! the scan and analysis streams additionally use their own historical names.
use bytes::BytesMut;
use docflow_core::{EventKind, PhaseSummary, ProgressEvent, StepId};
use docflow_logging::flow_warn;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::models::{AnalysisResult, IndexResult, ScanResult};

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed event json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event result does not match the {step} summary: {source}")]
    Result {
        step: StepId,
        source: serde_json::Error,
    },
}

/// Splits a byte stream into complete lines, buffering partial input.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: BytesMut,
}

impl LineDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(end) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line = self.buffer.split_to(end + 1);
            lines.push(to_line(&line[..end]));
        }
        lines
    }

    /// Returns whatever is left once the body has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = self.buffer.split();
        Some(to_line(&rest))
    }
}

fn to_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\r')
        .to_string()
}

/// The JSON payload of a line, or `None` for blank and control lines.
pub fn event_payload(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    if let Some(data) = line.strip_prefix("data:") {
        let data = data.trim();
        return (!data.is_empty()).then_some(data);
    }
    if ["event:", "id:", "retry:"]
        .iter()
        .any(|field| line.starts_with(field))
    {
        return None;
    }
    Some(line)
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    event_type: String,
    message: Option<String>,
    current_item: Option<String>,
    current_file: Option<String>,
    current_rfi: Option<Value>,
    sub_item: Option<String>,
    spec_name: Option<String>,
    phase: Option<String>,
    current_index: Option<u32>,
    current_file_index: Option<u32>,
    total_items: Option<u32>,
    total_files: Option<u32>,
    completed: Option<u32>,
    total: Option<u32>,
    errors: Option<u32>,
    success: Option<bool>,
    result: Option<Value>,
    error: Option<String>,
}

/// Decodes one payload for the given step.
///
/// `Ok(None)` means the event kind is not one this step understands; it is
/// logged and skipped.
pub fn decode_event(step: StepId, payload: &str) -> Result<Option<ProgressEvent>, WireError> {
    let wire: WireEvent = serde_json::from_str(payload)?;
    let Some(kind) = classify(step, &wire.event_type, wire.success) else {
        flow_warn!(
            "Skipping unknown {} event type '{}'",
            step,
            wire.event_type
        );
        return Ok(None);
    };

    let result = match kind {
        EventKind::PhaseDone => summary_for(step, &wire),
        _ => None,
    };
    let current_item = wire
        .current_item
        .or(wire.current_file)
        .or(wire.current_rfi.map(value_label));
    let error = match kind {
        EventKind::Error { .. } => wire.error.or_else(|| wire.message.clone()),
        _ => wire.error,
    };

    Ok(Some(ProgressEvent {
        kind,
        message: wire.message.unwrap_or_default(),
        current_item,
        sub_item: wire.sub_item.or(wire.spec_name).or(wire.phase),
        current_index: wire
            .current_index
            .or(wire.current_file_index)
            .or(wire.completed),
        // Zero is what the server sends before it knows the total.
        total_items: wire
            .total_items
            .or(wire.total_files)
            .or(wire.total)
            .filter(|total| *total > 0),
        result,
        error,
    }))
}

fn classify(step: StepId, event_type: &str, success: Option<bool>) -> Option<EventKind> {
    let done = EventKind::ItemDone {
        success: success.unwrap_or(true),
    };
    let kind = match event_type {
        "start" => EventKind::Start,
        "item_progress" => EventKind::ItemProgress,
        "item_done" => done,
        "phase_done" => EventKind::PhaseDone,
        "error" | "fatal_error" => EventKind::Error { transport: false },
        other => match (step, other) {
            (StepId::Scan, "scanning" | "parsing") => EventKind::ItemProgress,
            (StepId::Scan, "complete") => EventKind::PhaseDone,
            (StepId::Analyze, "parsing" | "parsing_spec" | "generating") => {
                EventKind::ItemProgress
            }
            (StepId::Analyze, "completed") => done,
            (StepId::Analyze, "done") => EventKind::PhaseDone,
            _ => return None,
        },
    };
    Some(kind)
}

/// A `result` that does not decode is logged and dropped; the terminal event
/// still completes the phase and the reducer falls back to its own counters.
fn summary_for(step: StepId, wire: &WireEvent) -> Option<PhaseSummary> {
    let reported = wire.result.as_ref().filter(|value| !value.is_null());
    let decoded = reported.and_then(|value| {
        let summary = match step {
            StepId::Scan => parse::<ScanResult>(step, value).map(|r| PhaseSummary::Scan(r.into())),
            StepId::Index => {
                parse::<IndexResult>(step, value).map(|r| PhaseSummary::Index(r.into()))
            }
            StepId::Analyze => {
                parse::<AnalysisResult>(step, value).map(|r| PhaseSummary::Analysis(r.into()))
            }
        };
        summary
            .map_err(|err| flow_warn!("Ignoring {} result: {}", step, err))
            .ok()
    });
    if decoded.is_some() {
        return decoded;
    }
    match step {
        StepId::Analyze if wire.completed.is_some() || wire.total.is_some() => {
            Some(PhaseSummary::Analysis(
                AnalysisResult {
                    completed: wire.completed.unwrap_or(0),
                    failed: wire.errors.unwrap_or(0),
                    total: wire.total.unwrap_or(0),
                }
                .into(),
            ))
        }
        _ => None,
    }
}

fn parse<T: DeserializeOwned>(step: StepId, value: &Value) -> Result<T, WireError> {
    T::deserialize(value).map_err(|source| WireError::Result { step, source })
}

fn value_label(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
