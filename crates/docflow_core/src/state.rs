use std::collections::BTreeMap;

use docflow_logging::{flow_debug, flow_info};

use crate::pipeline::Applied;
use crate::view_model::{BoardView, RunView, StepView};
use crate::{
    Effect, PipelineInput, PipelineRun, ProgressEvent, ProjectId, ResultId, RunId, StaleTag,
    ValidationError,
};

/// Regenerate one analysis result against an edited spec selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefineRequest {
    pub project_id: ProjectId,
    pub result_id: ResultId,
    pub spec_paths: Vec<String>,
    pub instruction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefineStatus {
    Pending,
    Done,
    Failed(String),
    Rejected(ValidationError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RefineEntry {
    project_id: ProjectId,
    status: RefineStatus,
}

/// All workflow state owned by one client: at most one run per project.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Board {
    runs: BTreeMap<ProjectId, PipelineRun>,
    next_run_id: RunId,
    refines: BTreeMap<ResultId, RefineEntry>,
    rejections: BTreeMap<ProjectId, ValidationError>,
    dirty: bool,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(&self, project_id: ProjectId) -> Option<&PipelineRun> {
        self.runs.get(&project_id)
    }

    pub fn run_by_id(&self, run_id: RunId) -> Option<&PipelineRun> {
        self.runs.values().find(|run| run.id() == run_id)
    }

    pub fn active_run_ids(&self) -> Vec<RunId> {
        self.runs
            .values()
            .filter(|run| run.is_active())
            .map(PipelineRun::id)
            .collect()
    }

    /// Last synchronously refused start for the project, if any.
    pub fn rejection(&self, project_id: ProjectId) -> Option<&ValidationError> {
        self.rejections.get(&project_id)
    }

    pub fn refine_status(&self, result_id: ResultId) -> Option<&RefineStatus> {
        self.refines.get(&result_id).map(|entry| &entry.status)
    }

    /// Hands out a settled refine outcome once and forgets it.
    /// Pending and unknown results yield `None`.
    pub fn take_settled_refine(&mut self, result_id: ResultId) -> Option<RefineStatus> {
        match self.refines.get(&result_id) {
            Some(entry) if entry.status != RefineStatus::Pending => {}
            _ => return None,
        }
        self.refines.remove(&result_id).map(|entry| entry.status)
    }

    pub fn view(&self) -> BoardView {
        BoardView {
            runs: self.runs.values().map(run_view).collect(),
            rejections: self
                .rejections
                .iter()
                .map(|(project, err)| (*project, err.to_string()))
                .collect(),
            pending_refines: self
                .refines
                .iter()
                .filter(|(_, entry)| entry.status == RefineStatus::Pending)
                .map(|(id, _)| *id)
                .collect(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, then clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn reject(&mut self, project_id: ProjectId, err: ValidationError) {
        flow_info!("Refused to start pipeline for project {}: {}", project_id, err);
        self.rejections.insert(project_id, err);
        self.dirty = true;
    }

    /// Replaces any run of the project with a fresh one and opens its first phase.
    pub(crate) fn start_run(&mut self, project_id: ProjectId, input: PipelineInput) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(previous) = self.cancel_run(project_id) {
            flow_info!(
                "Run {} for project {} replaced by a new start",
                previous,
                project_id
            );
            effects.push(Effect::CloseStream { run_id: previous });
        }
        self.rejections.remove(&project_id);

        self.next_run_id += 1;
        let run_id = self.next_run_id;
        let mut run = PipelineRun::new(run_id, project_id, input);
        flow_info!(
            "Run {} starts {:?} for project {}",
            run_id,
            run.kind(),
            project_id
        );
        if let Some((phase_index, request)) = run.open_from(0) {
            effects.push(Effect::OpenPhase {
                run_id,
                phase_index,
                request,
            });
        }
        self.runs.insert(project_id, run);
        self.dirty = true;
        effects
    }

    pub(crate) fn apply_phase_event(
        &mut self,
        run_id: RunId,
        phase_index: usize,
        event: &ProgressEvent,
    ) -> Vec<Effect> {
        let Some(run) = self.runs.values_mut().find(|run| run.id() == run_id) else {
            flow_debug!("Dropping {:?} for unknown run {}", event.kind, run_id);
            return Vec::new();
        };

        match run.apply(phase_index, event) {
            Applied::Ignored => Vec::new(),
            Applied::Progress => {
                self.dirty = true;
                Vec::new()
            }
            Applied::PhaseComplete { affects } => {
                self.dirty = true;
                let mut effects = Vec::with_capacity(2);
                if !affects.is_empty() {
                    effects.push(Effect::MarkStale(affects));
                }
                match run.open_from(phase_index + 1) {
                    Some((next, request)) => effects.push(Effect::OpenPhase {
                        run_id,
                        phase_index: next,
                        request,
                    }),
                    None => {
                        flow_info!("Run {} complete", run_id);
                        effects.push(Effect::CloseStream { run_id });
                    }
                }
                effects
            }
            Applied::PhaseFailed => {
                flow_info!("Run {} failed in phase {}", run_id, phase_index);
                self.dirty = true;
                vec![Effect::CloseStream { run_id }]
            }
        }
    }

    /// Cancels the project's active run and returns its id.
    pub(crate) fn cancel_run(&mut self, project_id: ProjectId) -> Option<RunId> {
        let run = self.runs.get_mut(&project_id)?;
        if run.cancel() {
            flow_info!("Run {} cancelled", run.id());
            self.dirty = true;
            Some(run.id())
        } else {
            None
        }
    }

    /// Drops the project's run entirely, cancelling it first when active.
    pub(crate) fn discard_run(&mut self, project_id: ProjectId) -> Option<RunId> {
        let cancelled = self.cancel_run(project_id);
        if self.runs.remove(&project_id).is_some() {
            self.dirty = true;
        }
        self.rejections.remove(&project_id);
        self.refines.retain(|_, entry| {
            entry.project_id != project_id || entry.status == RefineStatus::Pending
        });
        cancelled
    }

    pub(crate) fn begin_refine(&mut self, request: &RefineRequest) -> bool {
        if request.spec_paths.is_empty() {
            let err = ValidationError::NoSpecsForRefine {
                result_id: request.result_id,
            };
            flow_info!("Refused refine: {}", err);
            self.refines.insert(
                request.result_id,
                RefineEntry {
                    project_id: request.project_id,
                    status: RefineStatus::Rejected(err),
                },
            );
            self.dirty = true;
            return false;
        }
        if self.refine_status(request.result_id) == Some(&RefineStatus::Pending) {
            flow_debug!("Refine for result {} already pending", request.result_id);
            return false;
        }
        self.refines.insert(
            request.result_id,
            RefineEntry {
                project_id: request.project_id,
                status: RefineStatus::Pending,
            },
        );
        self.dirty = true;
        true
    }

    pub(crate) fn settle_refine(
        &mut self,
        result_id: ResultId,
        outcome: Result<(), String>,
    ) -> Vec<Effect> {
        let Some(entry) = self.refines.get_mut(&result_id) else {
            flow_debug!("Refine outcome for unknown result {}", result_id);
            return Vec::new();
        };
        if entry.status != RefineStatus::Pending {
            return Vec::new();
        }
        self.dirty = true;
        match outcome {
            Ok(()) => {
                entry.status = RefineStatus::Done;
                vec![Effect::MarkStale(vec![StaleTag::Results(entry.project_id)])]
            }
            Err(message) => {
                entry.status = RefineStatus::Failed(message);
                Vec::new()
            }
        }
    }
}

fn run_view(run: &PipelineRun) -> RunView {
    let steps: Vec<StepView> = run
        .phases()
        .iter()
        .map(|slot| StepView {
            step: slot.spec.step,
            label: slot.spec.step.label(),
            state: slot.state.clone(),
        })
        .collect();
    RunView {
        project_id: run.project_id(),
        run_id: run.id(),
        kind: run.kind(),
        outcome: run.outcome(),
        progress: overall_progress(&steps),
        steps,
    }
}

/// Each phase contributes an equal share; a running phase adds its own fraction.
fn overall_progress(steps: &[StepView]) -> f32 {
    if steps.is_empty() {
        return 0.0;
    }
    let done: f32 = steps
        .iter()
        .map(|step| match &step.state {
            crate::WorkflowPhase::Complete(_) => 1.0,
            crate::WorkflowPhase::Running(_, detail) => detail.fraction().unwrap_or(0.0),
            _ => 0.0,
        })
        .sum();
    done / steps.len() as f32
}
