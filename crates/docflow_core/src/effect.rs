use crate::{PhaseRequest, RefineRequest, RunId, StaleTag};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open the event stream for a phase. Replaces any stream the run holds.
    OpenPhase {
        run_id: RunId,
        phase_index: usize,
        request: PhaseRequest,
    },
    /// Cancel and drop the run's stream handle, if any.
    CloseStream { run_id: RunId },
    /// Result collections that dependent views must refetch.
    MarkStale(Vec<StaleTag>),
    /// Issue a one-shot refine request.
    Refine(RefineRequest),
}
