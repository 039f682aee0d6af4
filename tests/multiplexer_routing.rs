//! Post-handshake routing: broadcast notifications and single-backend requests.

mod helpers;

use helpers::{Call, CallKind, RecordingBackend, calls, init_logger, journal};
use lspx::{ErrorCodes, Multiplexer, ResponseError};
use serde_json::json;

async fn initialized<B: lspx::Backend>(multiplexer: &Multiplexer<B>) {
    multiplexer
        .request("initialize", json!({"capabilities": {}}))
        .await
        .expect("initialize should succeed");
}

fn after_handshake(journal: &helpers::Journal) -> Vec<Call> {
    calls(journal)
        .into_iter()
        .filter(|call| call.method != "initialize")
        .collect()
}

#[tokio::test]
async fn notify_is_broadcast_to_every_backend_in_list_order() {
    init_logger();
    let journal = journal();
    let (a, _pa) = RecordingBackend::new("a", &journal).endpoint();
    let (b, _pb) = RecordingBackend::new("b", &journal).endpoint();
    let (c, _pc) = RecordingBackend::new("c", &journal).endpoint();
    let multiplexer = Multiplexer::new(vec![c, a, b]);
    initialized(&multiplexer).await;

    let params = json!({"textDocument": {"uri": "file:///doc.md", "version": 2}});
    multiplexer
        .notify("textDocument/didChange", params.clone())
        .await
        .unwrap();

    let expected: Vec<Call> = ["c", "a", "b"]
        .into_iter()
        .map(|server| Call {
            server: server.to_string(),
            kind: CallKind::Notify,
            method: "textDocument/didChange".to_string(),
            params: params.clone(),
        })
        .collect();
    assert_eq!(after_handshake(&journal), expected);
}

#[tokio::test]
async fn request_is_routed_to_first_backend_only() {
    init_logger();
    let journal = journal();
    let (a, _pa) = RecordingBackend::new("a", &journal).endpoint();
    let (b, _pb) = RecordingBackend::new("b", &journal).endpoint();
    let (c, _pc) = RecordingBackend::new("c", &journal).endpoint();
    let multiplexer = Multiplexer::new(vec![a, b, c]);
    initialized(&multiplexer).await;

    let result = multiplexer
        .request("textDocument/definition", json!({"line": 3}))
        .await
        .unwrap();

    assert_eq!(
        result,
        json!({"server": "a", "method": "textDocument/definition"})
    );
    assert_eq!(
        after_handshake(&journal),
        vec![Call {
            server: "a".to_string(),
            kind: CallKind::Request,
            method: "textDocument/definition".to_string(),
            params: json!({"line": 3}),
        }]
    );
}

#[tokio::test]
async fn routed_backend_error_is_passed_through_unmodified() {
    init_logger();
    let journal = journal();
    let backend_error =
        ResponseError::new(-32801, "content modified").with_data(json!({"uri": "file:///a"}));
    let (a, _pa) = RecordingBackend::new("a", &journal)
        .failing_requests(backend_error.clone())
        .endpoint();
    let (b, _pb) = RecordingBackend::new("b", &journal).endpoint();
    let multiplexer = Multiplexer::new(vec![a, b]);
    initialized(&multiplexer).await;

    let error = multiplexer
        .request("textDocument/hover", json!({}))
        .await
        .unwrap_err();

    assert_eq!(error, backend_error);
    assert!(
        after_handshake(&journal).iter().all(|call| call.server == "a"),
        "the failure must not fall through to another backend"
    );
}

#[tokio::test]
async fn broadcast_stops_at_first_failing_backend() {
    init_logger();
    let journal = journal();
    let (a, _pa) = RecordingBackend::new("a", &journal).endpoint();
    let (b, _pb) = RecordingBackend::new("b", &journal)
        .failing_notify(ResponseError::request_failed("b: pipe closed"))
        .endpoint();
    let (c, _pc) = RecordingBackend::new("c", &journal).endpoint();
    let multiplexer = Multiplexer::new(vec![a, b, c]);
    initialized(&multiplexer).await;

    let error = multiplexer
        .notify("workspace/didChangeConfiguration", json!({"settings": {}}))
        .await
        .unwrap_err();

    assert_eq!(error, ResponseError::request_failed("b: pipe closed"));
    let notified: Vec<String> = after_handshake(&journal)
        .into_iter()
        .map(|call| call.server)
        .collect();
    assert_eq!(notified, vec!["a", "b"]);
}

#[tokio::test]
async fn request_with_no_agents_is_an_internal_error() {
    init_logger();
    let multiplexer: Multiplexer<RecordingBackend> = Multiplexer::new(vec![]);
    initialized(&multiplexer).await;

    let error = multiplexer
        .request("textDocument/hover", json!({}))
        .await
        .unwrap_err();

    assert_eq!(error.code, ErrorCodes::INTERNAL_ERROR);
}

#[tokio::test]
async fn notify_with_no_agents_succeeds() {
    init_logger();
    let multiplexer: Multiplexer<RecordingBackend> = Multiplexer::new(vec![]);
    initialized(&multiplexer).await;

    multiplexer
        .notify("initialized", json!({}))
        .await
        .expect("broadcast to nobody should succeed");
}

#[tokio::test]
async fn errors_convert_to_jsonrpc_errors_for_the_wire() {
    init_logger();
    let multiplexer: Multiplexer<RecordingBackend> = Multiplexer::new(vec![]);

    let error = multiplexer
        .request("shutdown", json!(null))
        .await
        .unwrap_err();
    let wire = serde_json::to_value(&error).unwrap();
    let rpc: tower_lsp_server::jsonrpc::Error = error.into();

    assert_eq!(wire, json!({"code": -32002, "message": "server not initialized"}));
    assert_eq!(rpc.message, "server not initialized");
}
