use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use docflow_core::{PhaseRequest, ProgressEvent};
use docflow_logging::{flow_debug, flow_trace, flow_warn};
use tokio_util::sync::CancellationToken;

/// Receives decoded events of one open phase, one at a time and in order.
///
/// `emit` runs while the stream's gate is held, so it must not call back into
/// the `StreamHandle` that feeds it.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Opens one long-running server phase and streams its events to `sink`.
pub trait PhaseOpener: Send + Sync {
    fn open(&self, request: PhaseRequest, sink: Arc<dyn EventSink>) -> StreamHandle;
}

#[derive(Debug, Default)]
struct GateState {
    closed: bool,
    last_index: Option<u32>,
    total: Option<u32>,
}

/// Serialises delivery for one stream and enforces its lifecycle:
/// at most one terminal event, nothing after close, indices never go back.
pub struct StreamGate {
    sink: Arc<dyn EventSink>,
    state: Mutex<GateState>,
    token: CancellationToken,
}

impl StreamGate {
    pub fn new(sink: Arc<dyn EventSink>) -> Arc<Self> {
        Arc::new(Self {
            sink,
            state: Mutex::new(GateState::default()),
            token: CancellationToken::new(),
        })
    }

    /// Token that fires once the gate closes, for the transport task to watch.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Hands `event` to the sink unless the gate is closed. Returns whether it was delivered.
    pub fn deliver(&self, mut event: ProgressEvent) -> bool {
        let mut state = self.lock();
        if state.closed {
            flow_trace!("Dropping event after close: {:?}", event.kind);
            return false;
        }

        if let Some(index) = event.current_index {
            let floor = state.last_index.unwrap_or(0);
            if index < floor {
                flow_debug!("Clamping regressed index {} to {}", index, floor);
                event.current_index = Some(floor);
            }
            state.last_index = Some(index.max(floor));
        }
        match (state.total, event.total_items) {
            (None, Some(total)) => state.total = Some(total),
            (Some(known), Some(total)) if known != total => {
                flow_warn!("Ignoring changed total {} (was {})", total, known);
                event.total_items = Some(known);
            }
            _ => {}
        }

        if event.is_terminal() {
            state.closed = true;
            self.token.cancel();
        }
        self.sink.emit(event);
        true
    }

    /// Closes the gate. Once this returns no further event reaches the sink.
    pub fn close(&self) -> bool {
        let mut state = self.lock();
        let was_open = !state.closed;
        state.closed = true;
        self.token.cancel();
        was_open
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Caller-side handle of an open stream. Dropping it cancels the stream.
pub struct StreamHandle {
    gate: Arc<StreamGate>,
}

impl StreamHandle {
    pub fn new(gate: Arc<StreamGate>) -> Self {
        Self { gate }
    }

    /// Stops delivery synchronously and aborts the transport. Idempotent.
    pub fn cancel(&self) {
        if self.gate.close() {
            flow_debug!("Stream cancelled");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.gate.is_closed()
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.gate.close();
    }
}
