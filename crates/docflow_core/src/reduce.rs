use docflow_logging::flow_debug;

use crate::{
    AnalysisSummary, ErrorDetail, EventKind, FailureOrigin, IndexSummary, PhaseDetail,
    PhaseSummary, ProgressEvent, ScanSummary, StepId, WorkflowPhase,
};

/// Pure reducer for one phase: folds a stream event into the phase state.
///
/// Terminal states absorb every later event unchanged.
pub fn reduce(step: StepId, state: WorkflowPhase, event: &ProgressEvent) -> WorkflowPhase {
    if state.is_terminal() {
        flow_debug!(
            "Ignoring {:?} for {} phase already in terminal state",
            event.kind,
            step
        );
        return state;
    }

    let detail = match state {
        WorkflowPhase::Running(_, detail) => detail,
        _ => PhaseDetail::default(),
    };

    match event.kind {
        EventKind::Start => WorkflowPhase::Running(
            step,
            PhaseDetail {
                message: event.message.clone(),
                total_items: event.total_items,
                ..PhaseDetail::default()
            },
        ),
        EventKind::ItemProgress => WorkflowPhase::Running(step, advance(detail, event)),
        EventKind::ItemDone { success } => {
            let mut detail = advance(detail, event);
            if success {
                detail.completed += 1;
            } else {
                detail.failed += 1;
            }
            WorkflowPhase::Running(step, detail)
        }
        EventKind::PhaseDone => WorkflowPhase::Complete(summarize(step, &detail, event)),
        EventKind::Error { transport } => WorkflowPhase::Failed(ErrorDetail {
            origin: if transport {
                FailureOrigin::Transport
            } else {
                FailureOrigin::Phase
            },
            message: event
                .error
                .clone()
                .filter(|_| !transport)
                .unwrap_or_else(|| event.message.clone()),
        }),
    }
}

fn advance(mut detail: PhaseDetail, event: &ProgressEvent) -> PhaseDetail {
    if !event.message.is_empty() {
        detail.message = event.message.clone();
    }
    if event.current_item.is_some() {
        detail.current_item = event.current_item.clone();
    }
    detail.sub_item = event.sub_item.clone();
    if let Some(index) = event.current_index {
        detail.current_index = detail.current_index.max(index);
    }
    if detail.total_items.is_none() {
        detail.total_items = event.total_items;
    }
    detail
}

fn summarize(step: StepId, detail: &PhaseDetail, event: &ProgressEvent) -> PhaseSummary {
    match (&event.result, step) {
        (Some(PhaseSummary::Analysis(reported)), _) => PhaseSummary::Analysis(AnalysisSummary {
            completed: reported.completed.max(detail.completed),
            failed: reported.failed.max(detail.failed),
            total: reported.total.max(detail.total_items.unwrap_or(0)),
        }),
        (Some(PhaseSummary::Scan(reported)), _) => PhaseSummary::Scan(ScanSummary {
            failed: reported.failed.max(detail.failed),
            ..reported.clone()
        }),
        (Some(PhaseSummary::Index(reported)), _) => PhaseSummary::Index(IndexSummary {
            failed: reported
                .failed
                .max(reported.errors.len() as u32)
                .max(detail.failed),
            ..reported.clone()
        }),
        (Some(summary), _) => summary.clone(),
        (None, StepId::Analyze) => PhaseSummary::Analysis(AnalysisSummary {
            completed: detail.completed,
            failed: detail.failed,
            total: detail.total_items.unwrap_or(detail.completed + detail.failed),
        }),
        (None, _) => PhaseSummary::Items {
            completed: detail.completed,
            failed: detail.failed,
        },
    }
}
