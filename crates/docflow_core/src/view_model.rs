use crate::{PipelineKind, ProjectId, ResultId, RunId, RunOutcome, StepId, WorkflowPhase};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoardView {
    pub runs: Vec<RunView>,
    pub rejections: Vec<(ProjectId, String)>,
    pub pending_refines: Vec<ResultId>,
    pub dirty: bool,
}

impl BoardView {
    pub fn run(&self, project_id: ProjectId) -> Option<&RunView> {
        self.runs.iter().find(|run| run.project_id == project_id)
    }
}

/// Stepper row set for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunView {
    pub project_id: ProjectId,
    pub run_id: RunId,
    pub kind: PipelineKind,
    pub outcome: RunOutcome,
    pub steps: Vec<StepView>,
    /// 0.0 ..= 1.0 across all phases.
    pub progress: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepView {
    pub step: StepId,
    pub label: &'static str,
    pub state: WorkflowPhase,
}
