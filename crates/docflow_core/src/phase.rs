use std::fmt;

/// Sub-operation a phase runs on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StepId {
    Scan,
    Index,
    Analyze,
}

impl StepId {
    pub fn as_str(self) -> &'static str {
        match self {
            StepId::Scan => "scan",
            StepId::Index => "index",
            StepId::Analyze => "analyze",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StepId::Scan => "Scanning files",
            StepId::Index => "Indexing knowledge base",
            StepId::Analyze => "Analyzing documents",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live counters of a running phase.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhaseDetail {
    pub message: String,
    pub current_item: Option<String>,
    pub sub_item: Option<String>,
    /// Never decreases while the phase runs.
    pub current_index: u32,
    /// Fixed once first observed.
    pub total_items: Option<u32>,
    pub completed: u32,
    pub failed: u32,
}

impl PhaseDetail {
    pub fn fraction(&self) -> Option<f32> {
        match self.total_items {
            Some(0) | None => None,
            Some(total) => Some((self.current_index.min(total) as f32) / total as f32),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanSummary {
    pub files_found: u32,
    pub files_added: u32,
    pub files_updated: u32,
    pub files_removed: u32,
    /// Files that could not be processed; the scan still completes.
    pub failed: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexSummary {
    pub files_indexed: u32,
    pub chunks_created: u32,
    /// Per-file failures; they do not fail the phase.
    pub errors: Vec<String>,
    /// Item-level failures, at least `errors.len()`.
    pub failed: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalysisSummary {
    pub completed: u32,
    pub failed: u32,
    pub total: u32,
}

/// Payload of a terminal `phase_done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseSummary {
    Scan(ScanSummary),
    Index(IndexSummary),
    Analysis(AnalysisSummary),
    /// Generic counts for phases whose server sent no result body.
    Items { completed: u32, failed: u32 },
    /// The user opted out of this phase when starting the run.
    Skipped,
}

impl PhaseSummary {
    pub fn item_errors(&self) -> u32 {
        match self {
            PhaseSummary::Scan(scan) => scan.failed,
            PhaseSummary::Index(index) => index.failed,
            PhaseSummary::Analysis(analysis) => analysis.failed,
            PhaseSummary::Items { failed, .. } => *failed,
            PhaseSummary::Skipped => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOrigin {
    /// The server reported a fatal error for the phase.
    Phase,
    /// The connection dropped before a terminal event.
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub origin: FailureOrigin,
    pub message: String,
}

/// State of one phase as shown in a stepper.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkflowPhase {
    #[default]
    Idle,
    Running(StepId, PhaseDetail),
    Complete(PhaseSummary),
    Failed(ErrorDetail),
    Cancelled,
}

impl WorkflowPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowPhase::Complete(_) | WorkflowPhase::Failed(_) | WorkflowPhase::Cancelled
        )
    }

    pub fn is_running(&self) -> bool {
        matches!(self, WorkflowPhase::Running(..))
    }

    pub fn detail(&self) -> Option<&PhaseDetail> {
        match self {
            WorkflowPhase::Running(_, detail) => Some(detail),
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<&PhaseSummary> {
        match self {
            WorkflowPhase::Complete(summary) => Some(summary),
            _ => None,
        }
    }
}
