use crate::{PipelineInput, ProgressEvent, ProjectId, RefineRequest, ResultId, RunId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User triggered a pipeline for a project (e.g. "Scan & Index").
    StartPipeline {
        project_id: ProjectId,
        input: PipelineInput,
    },
    /// Decoded event from the stream of one phase of a run.
    PhaseEvent {
        run_id: RunId,
        phase_index: usize,
        event: ProgressEvent,
    },
    /// User clicked Cancel.
    CancelClicked { project_id: ProjectId },
    /// The view owning the project's workflow went away.
    ViewClosed { project_id: ProjectId },
    /// User asked to regenerate one result against an edited spec selection.
    RefineRequested(RefineRequest),
    /// The refine request settled.
    RefineSettled {
        result_id: ResultId,
        outcome: Result<(), String>,
    },
    /// Fallback for placeholder wiring.
    NoOp,
}
