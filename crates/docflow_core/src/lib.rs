//! Docflow core: pure workflow state machines and view-model helpers.
mod effect;
mod error;
mod event;
mod msg;
mod phase;
mod pipeline;
mod reduce;
mod selection;
mod stale;
mod state;
mod suggestion;
mod update;
mod view_model;
mod wizard;

pub use effect::Effect;
pub use error::ValidationError;
pub use event::{EventKind, ProgressEvent, CONNECTION_LOST};
pub use msg::Msg;
pub use phase::{
    AnalysisSummary, ErrorDetail, FailureOrigin, IndexSummary, PhaseDetail, PhaseSummary,
    ScanSummary, StepId, WorkflowPhase,
};
pub use pipeline::{
    DocumentId, DocumentSelection, PhaseRequest, PhaseSlot, PhaseSpec, PipelineInput,
    PipelineKind, PipelineRun, ProjectId, ResultId, RunId, RunOutcome,
};
pub use reduce::reduce;
pub use selection::{
    is_within, CheckState, Rollup, SearchHit, SelectionTree, SpecCatalog, SpecFile, TreeRow,
    TreeView,
};
pub use stale::StaleTag;
pub use state::{Board, RefineRequest, RefineStatus};
pub use suggestion::{SuggestedSpec, SuggestionSet, SEED_LIMIT};
pub use update::update;
pub use view_model::{BoardView, RunView, StepView};
pub use wizard::{AnalysisWizard, WizardStep};
