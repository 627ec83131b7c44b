use docflow_core::{
    reduce, AnalysisSummary, ErrorDetail, EventKind, FailureOrigin, IndexSummary, PhaseSummary,
    ProgressEvent, ScanSummary, StepId, WorkflowPhase, CONNECTION_LOST,
};
use pretty_assertions::assert_eq;

fn fold(step: StepId, events: &[ProgressEvent]) -> WorkflowPhase {
    events
        .iter()
        .fold(WorkflowPhase::Idle, |state, event| reduce(step, state, event))
}

#[test]
fn start_resets_counters_and_keeps_total() {
    let state = fold(
        StepId::Scan,
        &[
            ProgressEvent::start("Scanning", Some(3)),
            ProgressEvent::item_progress("a.pdf", 2, Some(3)),
            ProgressEvent::start("Scanning again", Some(5)),
        ],
    );
    let detail = state.detail().expect("running");
    assert_eq!(detail.message, "Scanning again");
    assert_eq!(detail.current_index, 0);
    assert_eq!(detail.total_items, Some(5));
    assert_eq!(detail.completed, 0);
}

#[test]
fn progress_before_start_enters_running() {
    let state = fold(
        StepId::Scan,
        &[ProgressEvent::item_progress("a.pdf", 1, Some(4))],
    );
    assert!(matches!(state, WorkflowPhase::Running(StepId::Scan, _)));
    let detail = state.detail().expect("running");
    assert_eq!(detail.current_index, 1);
    assert_eq!(detail.current_item.as_deref(), Some("a.pdf"));
}

#[test]
fn index_never_decreases_and_total_is_stable() {
    let state = fold(
        StepId::Scan,
        &[
            ProgressEvent::start("Scanning", None),
            ProgressEvent::item_progress("a.pdf", 4, Some(10)),
            ProgressEvent::item_progress("b.pdf", 2, Some(12)),
        ],
    );
    let detail = state.detail().expect("running");
    assert_eq!(detail.current_index, 4);
    assert_eq!(detail.total_items, Some(10));
    assert_eq!(detail.current_item.as_deref(), Some("b.pdf"));
}

#[test]
fn completed_events_increment_instead_of_overwrite() {
    let state = fold(
        StepId::Analyze,
        &[
            ProgressEvent::start("Analyzing", Some(3)),
            ProgressEvent::item_done("RFI-1", true),
            ProgressEvent::item_done("RFI-2", true),
            ProgressEvent::item_done("RFI-3", false),
        ],
    );
    let detail = state.detail().expect("running");
    assert_eq!(detail.completed, 2);
    assert_eq!(detail.failed, 1);
}

#[test]
fn item_failure_does_not_abort_phase() {
    let done = ProgressEvent::phase_done(
        "Done",
        Some(PhaseSummary::Analysis(AnalysisSummary {
            completed: 1,
            failed: 0,
            total: 2,
        })),
    );
    let state = fold(
        StepId::Analyze,
        &[
            ProgressEvent::start("Analyzing", Some(2)),
            ProgressEvent::item_done("RFI-1", true),
            ProgressEvent::item_done("RFI-2", false),
            done,
        ],
    );
    assert_eq!(
        state,
        WorkflowPhase::Complete(PhaseSummary::Analysis(AnalysisSummary {
            completed: 1,
            failed: 1,
            total: 2,
        }))
    );
    assert_eq!(state.summary().map(PhaseSummary::item_errors), Some(1));
}

#[test]
fn phase_done_without_result_summarizes_counters() {
    let state = fold(
        StepId::Index,
        &[
            ProgressEvent::start("Indexing", None),
            ProgressEvent::item_done("a.pdf", true),
            ProgressEvent::phase_done("Indexed", None),
        ],
    );
    assert_eq!(
        state,
        WorkflowPhase::Complete(PhaseSummary::Items {
            completed: 1,
            failed: 0
        })
    );
}

#[test]
fn scan_summary_keeps_item_failures_counted_during_the_phase() {
    let state = fold(
        StepId::Scan,
        &[
            ProgressEvent::start("Scanning", Some(2)),
            ProgressEvent::item_done("a.pdf", true),
            ProgressEvent::item_done("b.pdf", false),
            ProgressEvent::phase_done(
                "Scan complete",
                Some(PhaseSummary::Scan(ScanSummary {
                    files_found: 2,
                    files_added: 1,
                    ..ScanSummary::default()
                })),
            ),
        ],
    );

    let summary = state.summary().expect("complete");
    assert_eq!(
        summary,
        &PhaseSummary::Scan(ScanSummary {
            files_found: 2,
            files_added: 1,
            failed: 1,
            ..ScanSummary::default()
        })
    );
    assert_eq!(summary.item_errors(), 1);
}

#[test]
fn index_summary_counts_listed_and_streamed_failures() {
    let state = fold(
        StepId::Index,
        &[
            ProgressEvent::start("Indexing", None),
            ProgressEvent::item_done("a.pdf", false),
            ProgressEvent::item_done("b.pdf", false),
            ProgressEvent::phase_done(
                "Indexed",
                Some(PhaseSummary::Index(IndexSummary {
                    files_indexed: 4,
                    chunks_created: 20,
                    errors: vec!["a.pdf: unreadable".to_string()],
                    failed: 1,
                })),
            ),
        ],
    );

    assert_eq!(state.summary().map(PhaseSummary::item_errors), Some(2));
}

#[test]
fn phase_error_fails_with_server_message() {
    let state = fold(
        StepId::Scan,
        &[
            ProgressEvent::start("Scanning", Some(2)),
            ProgressEvent::error("Folder not found"),
        ],
    );
    assert_eq!(
        state,
        WorkflowPhase::Failed(ErrorDetail {
            origin: FailureOrigin::Phase,
            message: "Folder not found".to_string(),
        })
    );
}

#[test]
fn transport_error_reports_generic_message() {
    let state = fold(
        StepId::Index,
        &[ProgressEvent::connection_lost("connection reset by peer")],
    );
    assert_eq!(
        state,
        WorkflowPhase::Failed(ErrorDetail {
            origin: FailureOrigin::Transport,
            message: CONNECTION_LOST.to_string(),
        })
    );
}

#[test]
fn events_after_terminal_state_are_ignored() {
    let complete = WorkflowPhase::Complete(PhaseSummary::Scan(ScanSummary {
        files_found: 3,
        files_added: 3,
        ..ScanSummary::default()
    }));
    for event in [
        ProgressEvent::item_progress("late.pdf", 9, Some(9)),
        ProgressEvent::error("late"),
        ProgressEvent::new(EventKind::Start, "late start"),
    ] {
        assert_eq!(reduce(StepId::Scan, complete.clone(), &event), complete);
        assert_eq!(
            reduce(StepId::Scan, WorkflowPhase::Cancelled, &event),
            WorkflowPhase::Cancelled
        );
    }
}
