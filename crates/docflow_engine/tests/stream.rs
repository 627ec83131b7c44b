use std::sync::{Arc, Mutex};
use std::time::Duration;

use docflow_core::{
    AnalysisSummary, DocumentSelection, EventKind, IndexSummary, PhaseRequest, PhaseSummary,
    ProgressEvent, ScanSummary, CONNECTION_LOST,
};
use docflow_engine::{
    ApiClient, ClientSettings, EventSink, HttpPhaseOpener, PhaseOpener, StreamGate, StreamHandle,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct ChannelSink {
    tx: UnboundedSender<ProgressEvent>,
}

impl EventSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

fn opener(base_url: String) -> HttpPhaseOpener {
    docflow_logging::initialize_for_tests();
    let settings = ClientSettings {
        base_url,
        ..ClientSettings::default()
    };
    let api = ApiClient::new(settings).expect("client");
    HttpPhaseOpener::new(Arc::new(api), Handle::current())
}

fn open(
    opener: &HttpPhaseOpener,
    request: PhaseRequest,
) -> (StreamHandle, UnboundedReceiver<ProgressEvent>) {
    let (tx, rx) = unbounded_channel();
    let handle = opener.open(request, Arc::new(ChannelSink { tx }));
    (handle, rx)
}

/// Collects events up to and including the first terminal one.
async fn until_terminal(rx: &mut UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event before timeout")
            .expect("sink alive");
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            return events;
        }
    }
}

async fn assert_quiet(rx: &mut UnboundedReceiver<ProgressEvent>) {
    let next = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(
        matches!(next, Err(_) | Ok(None)),
        "unexpected event: {next:?}"
    );
}

fn sse(lines: &[serde_json::Value]) -> String {
    lines
        .iter()
        .map(|line| format!("data: {line}\n\n"))
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn scan_events_arrive_in_order_with_one_terminal() {
    let server = MockServer::start().await;
    let body = format!(
        ": connected\n{}",
        sse(&[
            json!({"event_type": "start", "message": "Scanning", "total_files": 0}),
            json!({"event_type": "scanning", "current_file": "a.pdf", "current_file_index": 1, "total_files": 2}),
            json!({"event_type": "parsing", "current_file": "b.pdf", "current_file_index": 2, "total_files": 2}),
            json!({"event_type": "complete", "message": "Done", "result": {
                "project_id": 4, "files_found": 2, "files_added": 2, "files_updated": 0, "files_removed": 0
            }}),
            json!({"event_type": "scanning", "current_file": "late.pdf", "current_file_index": 3}),
        ])
    );
    Mock::given(method("GET"))
        .and(path("/api/projects/4/scan-stream"))
        .and(query_param("parse_content", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let opener = opener(server.uri());
    let (handle, mut rx) = open(
        &opener,
        PhaseRequest::Scan {
            project_id: 4,
            parse_content: true,
        },
    );
    let events = until_terminal(&mut rx).await;
    let kinds: Vec<EventKind> = events.iter().map(|event| event.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::Start,
            EventKind::ItemProgress,
            EventKind::ItemProgress,
            EventKind::PhaseDone,
        ]
    );
    assert_eq!(events[2].current_item.as_deref(), Some("b.pdf"));
    assert!(matches!(
        events[3].result,
        Some(PhaseSummary::Scan(ref summary)) if summary.files_added == 2
    ));
    assert_quiet(&mut rx).await;
    assert!(handle.is_closed());
}

#[tokio::test(flavor = "multi_thread")]
async fn analysis_stream_posts_selections() {
    let server = MockServer::start().await;
    let body = sse(&[
        json!({"event_type": "start", "total": 2}),
        json!({"event_type": "generating", "current_rfi": "RFI-1", "completed": 0, "total": 2}),
        json!({"event_type": "completed", "current_rfi": "RFI-1", "completed": 1, "total": 2}),
        json!({"event_type": "completed", "current_rfi": "RFI-2", "success": false, "completed": 2, "total": 2}),
        json!({"event_type": "done", "completed": 1, "errors": 1, "total": 2}),
    ]);
    Mock::given(method("POST"))
        .and(path("/api/projects/4/process-stream"))
        .and(body_json(json!({
            "selections": [{"file_id": 21, "spec_paths": ["specs/A.pdf"]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let opener = opener(server.uri());
    let (_handle, mut rx) = open(
        &opener,
        PhaseRequest::Analyze {
            project_id: 4,
            selections: vec![DocumentSelection {
                document_id: 21,
                spec_paths: vec!["specs/A.pdf".to_string()],
            }],
        },
    );
    let events = until_terminal(&mut rx).await;
    assert_eq!(events.len(), 5);
    assert_eq!(events[3].kind, EventKind::ItemDone { success: false });
    assert_eq!(
        events[4].result,
        Some(PhaseSummary::Analysis(AnalysisSummary {
            completed: 1,
            failed: 1,
            total: 2,
        }))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_before_response_delivers_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/4/scan-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(
                    sse(&[json!({"event_type": "start"}), json!({"event_type": "complete"})]),
                    "text/event-stream",
                )
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let opener = opener(server.uri());
    let (handle, mut rx) = open(
        &opener,
        PhaseRequest::Scan {
            project_id: 4,
            parse_content: false,
        },
    );
    handle.cancel();
    assert!(handle.is_closed());
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_quiet(&mut rx).await;
}

/// Serves one close-delimited scan stream: `first` right away, `rest` after `pause`.
async fn slow_stream_server(first: String, rest: String, pause: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("address");
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;
        let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n";
        socket.write_all(head.as_bytes()).await.expect("head");
        socket.write_all(first.as_bytes()).await.expect("first");
        socket.flush().await.expect("flush");
        tokio::time::sleep(pause).await;
        // The client may already have hung up.
        let _ = socket.write_all(rest.as_bytes()).await;
        let _ = socket.shutdown().await;
    });
    format!("http://{address}")
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_mid_stream_stops_delivery_of_buffered_and_later_lines() {
    let base_url = slow_stream_server(
        sse(&[
            json!({"event_type": "start", "total_files": 3}),
            json!({"event_type": "scanning", "current_file": "a.pdf", "current_file_index": 1}),
        ]),
        sse(&[
            json!({"event_type": "scanning", "current_file": "b.pdf", "current_file_index": 2}),
            json!({"event_type": "complete", "result": {"files_found": 3}}),
        ]),
        Duration::from_millis(400),
    )
    .await;

    let opener = opener(base_url);
    let (handle, mut rx) = open(
        &opener,
        PhaseRequest::Scan {
            project_id: 4,
            parse_content: true,
        },
    );
    let mut seen = Vec::new();
    while seen.last().map(|event: &ProgressEvent| event.kind) != Some(EventKind::ItemProgress) {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event before timeout")
            .expect("sink alive");
        seen.push(event);
    }
    handle.cancel();

    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].current_item.as_deref(), Some("a.pdf"));
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_quiet(&mut rx).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn partial_scan_result_completes_the_phase() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/4/scan-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse(&[
                json!({"event_type": "start"}),
                json!({"event_type": "phase_done", "result": {"files_found": 3, "files_added": 3}}),
            ]),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let opener = opener(server.uri());
    let (_handle, mut rx) = open(
        &opener,
        PhaseRequest::Scan {
            project_id: 4,
            parse_content: true,
        },
    );
    let events = until_terminal(&mut rx).await;
    let last = events.last().expect("terminal");
    assert_eq!(last.kind, EventKind::PhaseDone);
    assert_eq!(
        last.result,
        Some(PhaseSummary::Scan(ScanSummary {
            files_found: 3,
            files_added: 3,
            ..ScanSummary::default()
        }))
    );
    assert_quiet(&mut rx).await;
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[test]
fn gate_clamps_regressed_index_and_keeps_first_total() {
    let sink = Arc::new(RecordingSink::default());
    let gate = StreamGate::new(sink.clone());

    assert!(gate.deliver(ProgressEvent::item_progress("a.pdf", 5, Some(10))));
    assert!(gate.deliver(ProgressEvent::item_progress("b.pdf", 3, Some(12))));
    assert!(gate.deliver(ProgressEvent::item_progress("c.pdf", 7, None)));

    let delivered: Vec<(Option<u32>, Option<u32>)> = sink
        .events()
        .iter()
        .map(|event| (event.current_index, event.total_items))
        .collect();
    assert_eq!(
        delivered,
        vec![(Some(5), Some(10)), (Some(5), Some(10)), (Some(7), None)]
    );
}

#[test]
fn gate_delivers_exactly_one_terminal_event() {
    let sink = Arc::new(RecordingSink::default());
    let gate = StreamGate::new(sink.clone());
    let token = gate.token();

    assert!(gate.deliver(ProgressEvent::phase_done("done", None)));
    assert!(gate.is_closed());
    assert!(token.is_cancelled());
    assert!(!gate.deliver(ProgressEvent::error("late failure")));
    assert!(!gate.deliver(ProgressEvent::item_progress("late.pdf", 9, None)));

    let kinds: Vec<EventKind> = sink.events().iter().map(|event| event.kind).collect();
    assert_eq!(kinds, vec![EventKind::PhaseDone]);
}

#[test]
fn closed_gate_drops_everything() {
    let sink = Arc::new(RecordingSink::default());
    let gate = StreamGate::new(sink.clone());
    let handle = StreamHandle::new(gate.clone());

    handle.cancel();
    assert!(!gate.deliver(ProgressEvent::start("too late", None)));
    assert!(!gate.close());
    assert!(sink.events().is_empty());
}

#[test]
fn dropping_the_handle_closes_the_gate() {
    let gate = StreamGate::new(Arc::new(RecordingSink::default()));
    let token = gate.token();

    drop(StreamHandle::new(gate.clone()));

    assert!(gate.is_closed());
    assert!(token.is_cancelled());
}

#[tokio::test(flavor = "multi_thread")]
async fn body_ending_without_terminal_is_connection_lost() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/4/scan-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse(&[
                json!({"event_type": "start"}),
                json!({"event_type": "scanning", "current_file": "a.pdf", "current_file_index": 1}),
            ]),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let opener = opener(server.uri());
    let (_handle, mut rx) = open(
        &opener,
        PhaseRequest::Scan {
            project_id: 4,
            parse_content: true,
        },
    );
    let events = until_terminal(&mut rx).await;
    assert_eq!(events.len(), 3);
    let last = &events[2];
    assert_eq!(last.kind, EventKind::Error { transport: true });
    assert_eq!(last.message, CONNECTION_LOST);
    assert_quiet(&mut rx).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn http_error_is_a_phase_failure_with_server_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/9/scan-stream"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Project not found"})))
        .mount(&server)
        .await;

    let opener = opener(server.uri());
    let (_handle, mut rx) = open(
        &opener,
        PhaseRequest::Scan {
            project_id: 9,
            parse_content: true,
        },
    );
    let events = until_terminal(&mut rx).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Error { transport: false });
    assert_eq!(events[0].message, "Project not found");
}

#[tokio::test(flavor = "multi_thread")]
async fn refused_connection_is_a_transport_failure() {
    // Nothing listens on the discard port.
    let opener = opener("http://127.0.0.1:9".to_string());
    let (_handle, mut rx) = open(
        &opener,
        PhaseRequest::Scan {
            project_id: 4,
            parse_content: true,
        },
    );
    let events = until_terminal(&mut rx).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Error { transport: true });
}

#[tokio::test(flavor = "multi_thread")]
async fn index_call_is_presented_as_a_phase() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/projects/4/index"))
        .and(query_param("force", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "project_id": 4,
            "files_indexed": 3,
            "chunks_created": 12,
            "errors": ["bad.pdf: unreadable"]
        })))
        .mount(&server)
        .await;

    let opener = opener(server.uri());
    let (_handle, mut rx) = open(
        &opener,
        PhaseRequest::Index {
            project_id: 4,
            force: true,
        },
    );
    let events = until_terminal(&mut rx).await;
    assert_eq!(events[0].kind, EventKind::Start);
    assert_eq!(
        events[1].result,
        Some(PhaseSummary::Index(IndexSummary {
            files_indexed: 3,
            chunks_created: 12,
            errors: vec!["bad.pdf: unreadable".to_string()],
            failed: 1,
        }))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn index_server_error_fails_the_phase() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/projects/4/index"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"detail": "Embedding model missing"})),
        )
        .mount(&server)
        .await;

    let opener = opener(server.uri());
    let (_handle, mut rx) = open(
        &opener,
        PhaseRequest::Index {
            project_id: 4,
            force: false,
        },
    );
    let events = until_terminal(&mut rx).await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].kind, EventKind::Error { transport: false });
    assert_eq!(events[1].message, "Embedding model missing");
}
