use docflow_core::{AnalysisSummary, EventKind, PhaseSummary, ScanSummary, StepId};
use docflow_engine::{decode_event, event_payload, LineDecoder};
use pretty_assertions::assert_eq;

#[test]
fn line_decoder_buffers_partial_lines_and_strips_carriage_returns() {
    let mut decoder = LineDecoder::default();
    assert_eq!(decoder.push(b"data: {\"a\""), Vec::<String>::new());
    assert_eq!(
        decoder.push(b":1}\r\n\r\ndata: x"),
        vec!["data: {\"a\":1}".to_string(), String::new()]
    );
    assert_eq!(decoder.finish(), Some("data: x".to_string()));
    assert_eq!(decoder.finish(), None);
}

#[test]
fn payload_skips_control_lines_and_accepts_bare_json() {
    assert_eq!(event_payload("data: {\"x\":1}"), Some("{\"x\":1}"));
    assert_eq!(event_payload("{\"x\":1}"), Some("{\"x\":1}"));
    assert_eq!(event_payload(""), None);
    assert_eq!(event_payload(": keep-alive"), None);
    assert_eq!(event_payload("event: progress"), None);
    assert_eq!(event_payload("retry: 3000"), None);
    assert_eq!(event_payload("data:"), None);
}

#[test]
fn scan_aliases_map_to_canonical_kinds() {
    let start = decode_event(
        StepId::Scan,
        r#"{"event_type":"start","message":"Scanning","current_file_index":0,"total_files":0}"#,
    )
    .expect("valid")
    .expect("known kind");
    assert_eq!(start.kind, EventKind::Start);
    assert_eq!(start.total_items, None);

    let progress = decode_event(
        StepId::Scan,
        r#"{"event_type":"parsing","current_file":"RFI-001.pdf","current_file_index":3,"total_files":9,"phase":"rfi"}"#,
    )
    .expect("valid")
    .expect("known kind");
    assert_eq!(progress.kind, EventKind::ItemProgress);
    assert_eq!(progress.current_item.as_deref(), Some("RFI-001.pdf"));
    assert_eq!(progress.sub_item.as_deref(), Some("rfi"));
    assert_eq!(progress.current_index, Some(3));
    assert_eq!(progress.total_items, Some(9));

    let done = decode_event(
        StepId::Scan,
        r#"{"event_type":"complete","message":"Scan complete","result":{"project_id":4,"files_found":9,"files_added":2,"files_updated":1,"files_removed":0}}"#,
    )
    .expect("valid")
    .expect("known kind");
    assert_eq!(done.kind, EventKind::PhaseDone);
    assert_eq!(
        done.result,
        Some(PhaseSummary::Scan(ScanSummary {
            files_found: 9,
            files_added: 2,
            files_updated: 1,
            files_removed: 0,
            failed: 0,
        }))
    );
}

#[test]
fn analysis_events_carry_counts_and_item_outcomes() {
    let generating = decode_event(
        StepId::Analyze,
        r#"{"event_type":"generating","current_rfi":17,"spec_name":"08 71 00","completed":1,"total":3}"#,
    )
    .expect("valid")
    .expect("known kind");
    assert_eq!(generating.kind, EventKind::ItemProgress);
    assert_eq!(generating.current_item.as_deref(), Some("17"));
    assert_eq!(generating.sub_item.as_deref(), Some("08 71 00"));
    assert_eq!(generating.current_index, Some(1));
    assert_eq!(generating.total_items, Some(3));

    let failed = decode_event(
        StepId::Analyze,
        r#"{"event_type":"completed","current_rfi":"RFI-2","success":false,"completed":2,"total":3}"#,
    )
    .expect("valid")
    .expect("known kind");
    assert_eq!(failed.kind, EventKind::ItemDone { success: false });

    let ok = decode_event(StepId::Analyze, r#"{"event_type":"completed","completed":3}"#)
        .expect("valid")
        .expect("known kind");
    assert_eq!(ok.kind, EventKind::ItemDone { success: true });

    let done = decode_event(
        StepId::Analyze,
        r#"{"event_type":"done","completed":2,"errors":1,"total":3}"#,
    )
    .expect("valid")
    .expect("known kind");
    assert_eq!(
        done.result,
        Some(PhaseSummary::Analysis(AnalysisSummary {
            completed: 2,
            failed: 1,
            total: 3,
        }))
    );
}

#[test]
fn both_error_spellings_are_phase_failures() {
    for line in [
        r#"{"event_type":"error","error":"Project not found"}"#,
        r#"{"event_type":"fatal_error","message":"Project not found"}"#,
    ] {
        let event = decode_event(StepId::Analyze, line)
            .expect("valid")
            .expect("known kind");
        assert_eq!(event.kind, EventKind::Error { transport: false });
        assert_eq!(event.error.as_deref(), Some("Project not found"));
        assert!(event.is_terminal());
    }
}

#[test]
fn unknown_kinds_are_skipped_and_garbage_is_an_error() {
    assert_eq!(
        decode_event(StepId::Scan, r#"{"event_type":"heartbeat"}"#).expect("valid json"),
        None
    );
    // Aliases are per step.
    assert_eq!(
        decode_event(StepId::Index, r#"{"event_type":"complete"}"#).expect("valid json"),
        None
    );
    assert!(decode_event(StepId::Scan, "{not json").is_err());
}

#[test]
fn partial_scan_result_fills_missing_counters_with_zero() {
    let done = decode_event(
        StepId::Scan,
        r#"{"event_type":"phase_done","result":{"files_found":3,"files_added":3}}"#,
    )
    .expect("valid")
    .expect("known kind");

    assert_eq!(done.kind, EventKind::PhaseDone);
    assert_eq!(
        done.result,
        Some(PhaseSummary::Scan(ScanSummary {
            files_found: 3,
            files_added: 3,
            ..ScanSummary::default()
        }))
    );
}

#[test]
fn undecodable_result_still_completes_the_phase() {
    let done = decode_event(
        StepId::Scan,
        r#"{"event_type":"complete","result":{"files_found":"many"}}"#,
    )
    .expect("valid")
    .expect("known kind");
    assert_eq!(done.kind, EventKind::PhaseDone);
    assert_eq!(done.result, None);

    let analysis = decode_event(
        StepId::Analyze,
        r#"{"event_type":"done","result":"n/a","completed":2,"errors":1,"total":3}"#,
    )
    .expect("valid")
    .expect("known kind");
    assert_eq!(
        analysis.result,
        Some(PhaseSummary::Analysis(AnalysisSummary {
            completed: 2,
            failed: 1,
            total: 3,
        }))
    );
}
