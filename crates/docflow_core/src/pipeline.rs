use docflow_logging::flow_debug;

use crate::{
    reduce, PhaseDetail, PhaseSummary, ProgressEvent, StaleTag, StepId, ValidationError,
    WorkflowPhase,
};

pub type ProjectId = i64;
pub type DocumentId = i64;
pub type ResultId = i64;
pub type RunId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    ScanAndIndex,
    Analyze,
}

impl PipelineKind {
    /// Ordered phases of the pipeline and the collections each one invalidates.
    pub fn phases(self, project_id: ProjectId) -> Vec<PhaseSpec> {
        match self {
            PipelineKind::ScanAndIndex => vec![
                PhaseSpec {
                    step: StepId::Scan,
                    skippable: false,
                    affects: vec![StaleTag::ProjectSummaries, StaleTag::ProjectFiles(project_id)],
                },
                PhaseSpec {
                    step: StepId::Index,
                    skippable: true,
                    affects: vec![
                        StaleTag::ProjectSummaries,
                        StaleTag::KnowledgeBaseStats(project_id),
                    ],
                },
            ],
            PipelineKind::Analyze => vec![PhaseSpec {
                step: StepId::Analyze,
                skippable: false,
                affects: vec![StaleTag::Results(project_id)],
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSpec {
    pub step: StepId,
    /// The user may opt out of this phase when starting the run.
    pub skippable: bool,
    pub affects: Vec<StaleTag>,
}

/// Approved spec paths for one source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSelection {
    pub document_id: DocumentId,
    pub spec_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineInput {
    ScanAndIndex {
        parse_content: bool,
        force_reindex: bool,
        skip_index: bool,
    },
    Analyze {
        selections: Vec<DocumentSelection>,
    },
}

impl PipelineInput {
    pub fn scan_and_index() -> Self {
        PipelineInput::ScanAndIndex {
            parse_content: true,
            force_reindex: false,
            skip_index: false,
        }
    }

    pub fn kind(&self) -> PipelineKind {
        match self {
            PipelineInput::ScanAndIndex { .. } => PipelineKind::ScanAndIndex,
            PipelineInput::Analyze { .. } => PipelineKind::Analyze,
        }
    }

    /// Synchronous checks run before any stream is opened.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            PipelineInput::ScanAndIndex { .. } => Ok(()),
            PipelineInput::Analyze { selections } => {
                if selections.is_empty() {
                    return Err(ValidationError::NoDocumentsSelected);
                }
                match selections.iter().find(|s| s.spec_paths.is_empty()) {
                    Some(empty) => Err(ValidationError::NoSpecsSelected {
                        document: empty.document_id,
                    }),
                    None => Ok(()),
                }
            }
        }
    }

    fn skips(&self, step: StepId) -> bool {
        matches!(
            (self, step),
            (
                PipelineInput::ScanAndIndex {
                    skip_index: true,
                    ..
                },
                StepId::Index
            )
        )
    }
}

/// Everything the engine needs to open one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseRequest {
    Scan {
        project_id: ProjectId,
        parse_content: bool,
    },
    Index {
        project_id: ProjectId,
        force: bool,
    },
    Analyze {
        project_id: ProjectId,
        selections: Vec<DocumentSelection>,
    },
}

impl PhaseRequest {
    pub fn step(&self) -> StepId {
        match self {
            PhaseRequest::Scan { .. } => StepId::Scan,
            PhaseRequest::Index { .. } => StepId::Index,
            PhaseRequest::Analyze { .. } => StepId::Analyze,
        }
    }

    pub fn project_id(&self) -> ProjectId {
        match self {
            PhaseRequest::Scan { project_id, .. }
            | PhaseRequest::Index { project_id, .. }
            | PhaseRequest::Analyze { project_id, .. } => *project_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Active,
    Complete,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSlot {
    pub spec: PhaseSpec,
    pub state: WorkflowPhase,
}

/// Result of feeding one event to a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Applied {
    Ignored,
    Progress,
    PhaseComplete { affects: Vec<StaleTag> },
    PhaseFailed,
}

/// One user-triggered chain of phases for a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRun {
    id: RunId,
    project_id: ProjectId,
    input: PipelineInput,
    slots: Vec<PhaseSlot>,
    active_index: Option<usize>,
    outcome: RunOutcome,
}

impl PipelineRun {
    pub(crate) fn new(id: RunId, project_id: ProjectId, input: PipelineInput) -> Self {
        let slots = input
            .kind()
            .phases(project_id)
            .into_iter()
            .map(|spec| PhaseSlot {
                spec,
                state: WorkflowPhase::Idle,
            })
            .collect();
        Self {
            id,
            project_id,
            input,
            slots,
            active_index: None,
            outcome: RunOutcome::Active,
        }
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn kind(&self) -> PipelineKind {
        self.input.kind()
    }

    pub fn phases(&self) -> &[PhaseSlot] {
        &self.slots
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    pub fn outcome(&self) -> RunOutcome {
        self.outcome
    }

    pub fn is_active(&self) -> bool {
        self.outcome == RunOutcome::Active
    }

    pub fn phase_state(&self, step: StepId) -> Option<&WorkflowPhase> {
        self.slots
            .iter()
            .find(|slot| slot.spec.step == step)
            .map(|slot| &slot.state)
    }

    /// Summaries of every phase that completed, in pipeline order.
    pub fn summaries(&self) -> Vec<(StepId, &PhaseSummary)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.state.summary().map(|s| (slot.spec.step, s)))
            .collect()
    }

    /// Moves to the first phase at or after `from` that is not skipped.
    /// Returns `None` and marks the run complete when nothing is left.
    pub(crate) fn open_from(&mut self, from: usize) -> Option<(usize, PhaseRequest)> {
        for index in from..self.slots.len() {
            let spec = &self.slots[index].spec;
            if spec.skippable && self.input.skips(spec.step) {
                flow_debug!("Run {} skips {} phase", self.id, spec.step);
                self.slots[index].state = WorkflowPhase::Complete(PhaseSummary::Skipped);
                continue;
            }
            let step = spec.step;
            self.slots[index].state = WorkflowPhase::Running(
                step,
                PhaseDetail {
                    message: format!("{}...", step.label()),
                    ..PhaseDetail::default()
                },
            );
            self.active_index = Some(index);
            return Some((index, self.request_for(step)));
        }
        self.active_index = None;
        self.outcome = RunOutcome::Complete;
        None
    }

    pub(crate) fn apply(&mut self, phase_index: usize, event: &ProgressEvent) -> Applied {
        if !self.is_active() || self.active_index != Some(phase_index) {
            flow_debug!(
                "Run {} ignores {:?} for phase {} (active {:?}, outcome {:?})",
                self.id,
                event.kind,
                phase_index,
                self.active_index,
                self.outcome
            );
            return Applied::Ignored;
        }

        let slot = &mut self.slots[phase_index];
        let state = std::mem::take(&mut slot.state);
        slot.state = reduce(slot.spec.step, state, event);
        match &slot.state {
            WorkflowPhase::Complete(_) => Applied::PhaseComplete {
                affects: slot.spec.affects.clone(),
            },
            WorkflowPhase::Failed(_) => {
                self.active_index = None;
                self.outcome = RunOutcome::Failed;
                Applied::PhaseFailed
            }
            _ => Applied::Progress,
        }
    }

    /// Stops the run. Returns false when it had already finished.
    pub(crate) fn cancel(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        if let Some(index) = self.active_index.take() {
            self.slots[index].state = WorkflowPhase::Cancelled;
        }
        self.outcome = RunOutcome::Cancelled;
        true
    }

    fn request_for(&self, step: StepId) -> PhaseRequest {
        let project_id = self.project_id;
        match (&self.input, step) {
            (PipelineInput::ScanAndIndex { parse_content, .. }, StepId::Scan) => {
                PhaseRequest::Scan {
                    project_id,
                    parse_content: *parse_content,
                }
            }
            (PipelineInput::ScanAndIndex { force_reindex, .. }, _) => PhaseRequest::Index {
                project_id,
                force: *force_reindex,
            },
            (PipelineInput::Analyze { selections }, _) => PhaseRequest::Analyze {
                project_id,
                selections: selections.clone(),
            },
        }
    }
}
