use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use docflow_core::{IndexSummary, PhaseRequest, PhaseSummary, ProgressEvent, ProjectId, StepId};
use docflow_logging::{flow_debug, flow_info, flow_warn};
use futures_util::{Stream, StreamExt};
use reqwest::RequestBuilder;
use tokio::runtime::Handle;

use crate::api::{check_status, ApiClient, PhaseApi};
use crate::stream::{EventSink, PhaseOpener, StreamGate, StreamHandle};
use crate::wire::{decode_event, event_payload, LineDecoder};

/// Opens phases against the docflow server on a tokio runtime.
pub struct HttpPhaseOpener {
    api: Arc<ApiClient>,
    runtime: Handle,
}

impl HttpPhaseOpener {
    pub fn new(api: Arc<ApiClient>, runtime: Handle) -> Self {
        Self { api, runtime }
    }
}

impl PhaseOpener for HttpPhaseOpener {
    fn open(&self, request: PhaseRequest, sink: Arc<dyn EventSink>) -> StreamHandle {
        let gate = StreamGate::new(sink);
        let handle = StreamHandle::new(gate.clone());
        flow_info!(
            "Opening {} phase for project {}",
            request.step(),
            request.project_id()
        );
        let api = self.api.clone();
        self.runtime.spawn(async move {
            run_phase(&api, request, &gate).await;
        });
        handle
    }
}

async fn run_phase(api: &ApiClient, request: PhaseRequest, gate: &StreamGate) {
    let step = request.step();
    let idle = api.settings().stream_idle_timeout;
    let builder = match request {
        PhaseRequest::Index { project_id, force } => {
            return run_index(api, project_id, force, gate).await;
        }
        PhaseRequest::Scan {
            project_id,
            parse_content,
        } => api.scan_stream(project_id, parse_content),
        PhaseRequest::Analyze {
            project_id,
            selections,
        } => api.analysis_stream(project_id, &selections),
    };
    match builder {
        Ok(builder) => pump_stream(step, builder, idle, gate).await,
        Err(err) => {
            gate.deliver(err.into_event());
        }
    }
}

/// Presents the one-shot index call as a phase: `start`, then one terminal event.
pub async fn run_index(api: &dyn PhaseApi, project_id: ProjectId, force: bool, gate: &StreamGate) {
    let token = gate.token();
    gate.deliver(ProgressEvent::start("Indexing specifications...", None));
    let outcome = tokio::select! {
        biased;
        _ = token.cancelled() => {
            flow_debug!("Index request for project {} abandoned", project_id);
            return;
        }
        outcome = api.index_knowledge_base(project_id, force) => outcome,
    };
    let event = match outcome {
        Ok(result) => {
            let summary = IndexSummary::from(result);
            ProgressEvent::phase_done(
                format!(
                    "Indexed {} files ({} chunks)",
                    summary.files_indexed, summary.chunks_created
                ),
                Some(PhaseSummary::Index(summary)),
            )
        }
        Err(err) => {
            flow_warn!("Index request for project {} failed: {}", project_id, err);
            err.into_event()
        }
    };
    gate.deliver(event);
}

enum Chunk {
    Data(Bytes),
    Failed(String),
    Idle,
    End,
}

async fn pump_stream(
    step: StepId,
    request: RequestBuilder,
    idle: Option<Duration>,
    gate: &StreamGate,
) {
    let token = gate.token();
    let sent = tokio::select! {
        biased;
        _ = token.cancelled() => return,
        sent = request.send() => sent,
    };
    let response = match sent {
        Ok(response) => response,
        Err(err) => {
            flow_warn!("{} stream could not connect: {}", step, err);
            gate.deliver(ProgressEvent::connection_lost(err.to_string()));
            return;
        }
    };
    let response = match check_status(response).await {
        Ok(response) => response,
        Err(err) => {
            gate.deliver(ProgressEvent::error(err.message));
            return;
        }
    };

    let mut body = Box::pin(response.bytes_stream());
    let mut lines = LineDecoder::default();
    loop {
        let chunk = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            chunk = next_chunk(&mut body, idle) => chunk,
        };
        match chunk {
            Chunk::Data(bytes) => {
                for line in lines.push(&bytes) {
                    if deliver_line(step, &line, gate) {
                        return;
                    }
                }
            }
            Chunk::Failed(cause) => {
                flow_warn!("{} stream dropped: {}", step, cause);
                gate.deliver(ProgressEvent::connection_lost(cause));
                return;
            }
            Chunk::Idle => {
                flow_warn!("{} stream went silent", step);
                gate.deliver(ProgressEvent::connection_lost("stream idle timeout"));
                return;
            }
            Chunk::End => break,
        }
    }

    if let Some(line) = lines.finish() {
        if deliver_line(step, &line, gate) {
            return;
        }
    }
    if gate.deliver(ProgressEvent::connection_lost(
        "stream ended without a terminal event",
    )) {
        flow_warn!("{} stream ended without a terminal event", step);
    }
}

async fn next_chunk<S>(body: &mut S, idle: Option<Duration>) -> Chunk
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    let next = match idle {
        Some(limit) => match tokio::time::timeout(limit, body.next()).await {
            Ok(next) => next,
            Err(_) => return Chunk::Idle,
        },
        None => body.next().await,
    };
    match next {
        Some(Ok(bytes)) => Chunk::Data(bytes),
        Some(Err(err)) => Chunk::Failed(err.to_string()),
        None => Chunk::End,
    }
}

/// Returns true once nothing more should be read from the stream.
fn deliver_line(step: StepId, line: &str, gate: &StreamGate) -> bool {
    let Some(payload) = event_payload(line) else {
        return false;
    };
    match decode_event(step, payload) {
        Ok(Some(event)) => {
            let terminal = event.is_terminal();
            if terminal {
                flow_info!("{} phase finished: {:?}", step, event.kind);
            }
            !gate.deliver(event) || terminal
        }
        Ok(None) => false,
        Err(err) => {
            flow_warn!("Skipping undecodable {} event: {}", step, err);
            false
        }
    }
}
