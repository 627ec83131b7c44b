use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use docflow_core::{
    update, Board, BoardView, Effect, Msg, PipelineInput, ProgressEvent, ProjectId,
    RefineRequest, RefineStatus, ResultId, RunId, StaleTag,
};
use docflow_logging::{flow_debug, flow_info, flow_warn};
use tokio::runtime::Handle;

use crate::api::{ApiClient, ClientSettings, PhaseApi};
use crate::http::HttpPhaseOpener;
use crate::invalidation::InvalidationBus;
use crate::stream::{EventSink, PhaseOpener, StreamHandle};
use crate::types::ApiError;

/// Routes one phase's events back into the coordinator inbox, tagged with the
/// run and phase they belong to.
struct InboxSink {
    run_id: RunId,
    phase_index: usize,
    tx: mpsc::Sender<Msg>,
}

impl EventSink for InboxSink {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(Msg::PhaseEvent {
            run_id: self.run_id,
            phase_index: self.phase_index,
            event,
        });
    }
}

/// Owns the board and executes the effects `update` asks for.
///
/// Stream events, refine outcomes and user actions all arrive as `Msg` and are
/// applied one at a time on the thread that calls `pump`.
pub struct Coordinator {
    board: Board,
    opener: Arc<dyn PhaseOpener>,
    api: Arc<dyn PhaseApi>,
    runtime: Handle,
    streams: HashMap<RunId, StreamHandle>,
    inbox_tx: mpsc::Sender<Msg>,
    inbox_rx: mpsc::Receiver<Msg>,
    bus: InvalidationBus,
}

impl Coordinator {
    pub fn new(opener: Arc<dyn PhaseOpener>, api: Arc<dyn PhaseApi>, runtime: Handle) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::channel();
        Self {
            board: Board::new(),
            opener,
            api,
            runtime,
            streams: HashMap::new(),
            inbox_tx,
            inbox_rx,
            bus: InvalidationBus::new(),
        }
    }

    /// Wires a coordinator to a live server.
    pub fn connect(settings: ClientSettings, runtime: Handle) -> Result<Self, ApiError> {
        let api = Arc::new(ApiClient::new(settings)?);
        let opener = Arc::new(HttpPhaseOpener::new(api.clone(), runtime.clone()));
        Ok(Self::new(opener, api, runtime))
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The current view, if anything changed since the last call.
    pub fn take_view_if_dirty(&mut self) -> Option<BoardView> {
        self.board.consume_dirty().then(|| self.board.view())
    }

    pub fn subscribe(&mut self, project: Option<ProjectId>) -> mpsc::Receiver<StaleTag> {
        self.bus.subscribe(project)
    }

    pub fn start(&mut self, project_id: ProjectId, input: PipelineInput) {
        self.dispatch(Msg::StartPipeline { project_id, input });
    }

    pub fn cancel(&mut self, project_id: ProjectId) {
        self.dispatch(Msg::CancelClicked { project_id });
    }

    pub fn close_view(&mut self, project_id: ProjectId) {
        self.dispatch(Msg::ViewClosed { project_id });
    }

    pub fn refine(&mut self, request: RefineRequest) {
        self.dispatch(Msg::RefineRequested(request));
    }

    /// The outcome of a settled refine, handed out once.
    pub fn take_settled_refine(&mut self, result_id: ResultId) -> Option<RefineStatus> {
        self.board.take_settled_refine(result_id)
    }

    pub fn open_stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn dispatch(&mut self, msg: Msg) {
        let board = std::mem::take(&mut self.board);
        let (board, effects) = update(board, msg);
        self.board = board;
        for effect in effects {
            self.run_effect(effect);
        }
    }

    /// Applies every message already waiting in the inbox.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(msg) = self.inbox_rx.try_recv() {
            self.dispatch(msg);
            applied += 1;
        }
        applied
    }

    /// Waits up to `wait` for the first message, then drains the inbox.
    pub fn pump_timeout(&mut self, wait: Duration) -> usize {
        match self.inbox_rx.recv_timeout(wait) {
            Ok(msg) => {
                self.dispatch(msg);
                1 + self.pump()
            }
            Err(_) => 0,
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::OpenPhase {
                run_id,
                phase_index,
                request,
            } => {
                let sink = Arc::new(InboxSink {
                    run_id,
                    phase_index,
                    tx: self.inbox_tx.clone(),
                });
                let handle = self.opener.open(request, sink);
                if let Some(previous) = self.streams.insert(run_id, handle) {
                    previous.cancel();
                }
            }
            Effect::CloseStream { run_id } => {
                if let Some(handle) = self.streams.remove(&run_id) {
                    flow_debug!("Closing stream of run {}", run_id);
                    handle.cancel();
                }
            }
            Effect::MarkStale(tags) => {
                self.bus.publish(&tags);
            }
            Effect::Refine(request) => {
                flow_info!(
                    "Refining result {} against {} specs",
                    request.result_id,
                    request.spec_paths.len()
                );
                let api = self.api.clone();
                let tx = self.inbox_tx.clone();
                self.runtime.spawn(async move {
                    let outcome = api.refine_result(&request).await;
                    if let Err(err) = &outcome {
                        flow_warn!("Refine of result {} failed: {}", request.result_id, err);
                    }
                    let _ = tx.send(Msg::RefineSettled {
                        result_id: request.result_id,
                        outcome: outcome.map(|_| ()).map_err(|err| err.message),
                    });
                });
            }
        }
    }
}
