//! Session and transport behavior over in-memory pipes
//!
//! Scripted peers check the exact wire traffic; the in-process worker tests
//! run the full compile, execute and format pipeline.
//!
//! Run with: cargo test --test session_tests

mod common;

use std::time::Duration;

use chinook_bridge::mcp::protocol::methods;
use chinook_bridge::{BridgeError, SessionHandle, SessionState};
use common::*;
use serde_json::json;

// ============================================================================
// HANDSHAKE
// ============================================================================

#[tokio::test]
async fn test_call_before_open_does_no_io() {
    let (mut session, mut peer) = connect(None);

    let err = session
        .call(methods::LIST_TOOLS, json!({}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BridgeError::SessionNotReady(SessionState::Uninitialized)
    ));
    assert!(peer.is_silent(Duration::from_millis(50)).await);
}

#[tokio::test]
async fn test_handshake_sends_initialize_then_initialized() {
    let (mut session, mut peer) = connect(None);

    let (opened, init) = tokio::join!(session.open(), peer.accept_handshake());
    opened.unwrap();

    assert_eq!(init["jsonrpc"], "2.0");
    assert_eq!(init["id"], 1);
    assert_eq!(init["method"], "initialize");
    assert_eq!(init["params"]["protocolVersion"], "2024-11-05");
    assert_eq!(init["params"]["capabilities"], json!({}));
    assert_eq!(init["params"]["clientInfo"]["name"], "chinook-bridge");

    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.server_info().unwrap()["serverInfo"]["name"], "peer");

    // open on a ready session is a no-op
    session.open().await.unwrap();
    assert!(peer.is_silent(Duration::from_millis(50)).await);
}

#[tokio::test]
async fn test_handshake_error_response_closes_session() {
    let (mut session, mut peer) = connect(None);

    let script = async {
        let init = peer.recv().await;
        peer.send(json!({
            "jsonrpc": "2.0",
            "id": init["id"],
            "error": {"code": -32603, "message": "catalogue unavailable"}
        }))
        .await;
    };
    let (opened, _) = tokio::join!(session.open(), script);

    match opened {
        Err(BridgeError::HandshakeFailed(cause)) => assert!(cause.contains("catalogue unavailable")),
        other => panic!("expected handshake failure, got {:?}", other),
    }
    assert_eq!(session.state(), SessionState::Closed);
    assert!(matches!(
        session.open().await,
        Err(BridgeError::SessionNotReady(SessionState::Closed))
    ));
}

#[tokio::test]
async fn test_handshake_on_closed_pipe() {
    let (mut session, peer) = connect(None);
    drop(peer);

    assert!(matches!(
        session.open().await,
        Err(BridgeError::HandshakeFailed(_))
    ));
    assert_eq!(session.state(), SessionState::Closed);
}

// ============================================================================
// CALLS
// ============================================================================

#[tokio::test]
async fn test_search_skips_noise_lines() {
    let (mut session, mut peer) = ready_session(None).await;

    let script = async {
        let request = peer.recv().await;
        assert_eq!(request["id"], 2);
        assert_eq!(request["method"], "tools/call");
        assert_eq!(request["params"]["name"], "search_music_database");
        assert_eq!(request["params"]["arguments"]["query"], "rock");

        peer.send_line("worker: warming up cache").await;
        peer.send_line("").await;
        peer.send_line("{not json").await;
        peer.reply(&request["id"], text_result("Found 0 results")).await;
    };
    let (answer, _) = tokio::join!(session.search("rock"), script);

    assert_eq!(answer.unwrap(), "Found 0 results");
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.pending_count(), 0);
}

#[tokio::test]
async fn test_search_skips_non_utf8_noise() {
    let (mut session, mut peer) = ready_session(None).await;

    let script = async {
        let request = peer.recv().await;
        peer.send_bytes(b"[worker] caf\xe9 warming up").await;
        peer.reply(&request["id"], json!({})).await;
    };
    let (result, _) = tokio::join!(session.call(methods::PING, json!({})), script);

    assert_eq!(result.unwrap(), json!({}));
    assert_eq!(session.state(), SessionState::Ready);
}

#[tokio::test]
async fn test_ids_increase_per_request() {
    let (mut session, mut peer) = ready_session(None).await;

    for expected in 2..5 {
        let script = async {
            let request = peer.recv().await;
            assert_eq!(request["id"], expected);
            peer.reply(&request["id"], json!({})).await;
        };
        let (result, _) = tokio::join!(session.call(methods::PING, json!({})), script);
        assert_eq!(result.unwrap(), json!({}));
    }
}

#[tokio::test]
async fn test_error_response_keeps_session_ready() {
    let (mut session, mut peer) = ready_session(None).await;

    let script = async {
        let request = peer.recv().await;
        peer.send(json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "error": {"code": -32601, "message": "Method not found: resources/list"}
        }))
        .await;
    };
    let (result, _) = tokio::join!(session.call("resources/list", json!({})), script);

    match result {
        Err(BridgeError::Rpc { code, message }) => {
            assert_eq!(code, -32601);
            assert_eq!(message, "Method not found: resources/list");
        }
        other => panic!("expected rpc error, got {:?}", other),
    }
    assert_eq!(session.state(), SessionState::Ready);
}

#[tokio::test]
async fn test_worker_requests_are_refused() {
    let (mut session, mut peer) = ready_session(None).await;

    let script = async {
        let request = peer.recv().await;
        peer.send(json!({"jsonrpc": "2.0", "id": 99, "method": "sampling/createMessage"}))
            .await;
        peer.send(json!({"jsonrpc": "2.0", "method": "notifications/progress"}))
            .await;

        let refusal = peer.recv().await;
        assert_eq!(refusal["id"], 99);
        assert_eq!(refusal["error"]["code"], -32601);

        peer.reply(&request["id"], json!({"tools": []})).await;
    };
    let (tools, _) = tokio::join!(session.list_tools(), script);

    assert!(tools.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_response_id_is_protocol_error() {
    let (mut session, mut peer) = ready_session(None).await;

    let script = async {
        let _request = peer.recv().await;
        peer.reply(&json!(42), json!({})).await;
    };
    let (result, _) = tokio::join!(session.call(methods::PING, json!({})), script);

    assert!(matches!(result, Err(BridgeError::Protocol(_))));
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_invalid_message_shape_is_protocol_error() {
    let (mut session, mut peer) = ready_session(None).await;

    let script = async {
        let _request = peer.recv().await;
        peer.send(json!({"jsonrpc": "2.0", "id": 2})).await;
    };
    let (result, _) = tokio::join!(session.call(methods::PING, json!({})), script);

    assert!(matches!(result, Err(BridgeError::Protocol(_))));
    assert_eq!(session.state(), SessionState::Closed);
}

// ============================================================================
// FAILURE AND SHUTDOWN
// ============================================================================

#[tokio::test]
async fn test_eof_closes_session() {
    let (mut session, peer) = ready_session(None).await;
    drop(peer);

    let err = session.call(methods::PING, json!({})).await.unwrap_err();
    assert!(matches!(err, BridgeError::TransportClosed));
    assert_eq!(session.state(), SessionState::Closed);

    let err = session.call(methods::PING, json!({})).await.unwrap_err();
    assert!(matches!(
        err,
        BridgeError::SessionNotReady(SessionState::Closed)
    ));
}

#[tokio::test]
async fn test_read_timeout() {
    let (mut session, mut peer) = ready_session(Some(Duration::from_millis(100))).await;

    let script = async {
        let request = peer.recv().await;
        assert_eq!(request["method"], "ping");
    };
    let (result, _) = tokio::join!(session.call(methods::PING, json!({})), script);

    assert!(matches!(result, Err(BridgeError::TransportTimeout(_))));
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let (mut session, mut peer) = ready_session(None).await;

    session.close().await;
    session.close().await;
    assert_eq!(session.state(), SessionState::Closed);

    // closing the writer is the shutdown signal
    assert_eq!(peer.lines.next_line().await.unwrap(), None);
}

// ============================================================================
// IN-PROCESS WORKER
// ============================================================================

#[tokio::test]
async fn test_end_to_end_search() {
    let (_dir, store) = seed_catalogue();
    let mut session = in_process_session(store);
    session.open().await.unwrap();

    let tools = session.list_tools().await.unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "search_music_database");

    let answer = session.search("long songs").await.unwrap();
    assert!(answer.starts_with("Found 6 results for 'long songs':\n\n"));
    assert!(answer.contains("1. Track: So What | Artist: Miles Davis"));

    let answer = session.search("jazz artists").await.unwrap();
    assert!(answer.contains("Artist: Miles Davis | Genre: Jazz | TrackCount: 2"));

    let answer = session.search("").await.unwrap();
    assert_eq!(answer, "Please provide a search query");

    let answer = session.search("   ").await.unwrap();
    assert!(answer.starts_with("Found 3 results for '   ':\n\n"));

    session.close().await;
}

#[tokio::test]
async fn test_handle_serves_concurrent_callers() {
    let (_dir, store) = seed_catalogue();
    let (handle, task) = SessionHandle::spawn(in_process_session(store));

    let (a, b, c) = tokio::join!(
        handle.search("metallica"),
        handle.search("brazilian customers"),
        handle.list_tools(),
    );
    assert!(a.unwrap().contains("Artist: Metallica | Albums: 1 | Tracks: 2"));
    assert!(b.unwrap().contains("Country: Brazil | CustomerCount: 1"));
    assert_eq!(c.unwrap().len(), 1);

    handle.close().await;
    assert!(matches!(
        handle.search("metallica").await,
        Err(BridgeError::SessionNotReady(SessionState::Closed))
    ));

    drop(handle);
    task.await.unwrap();
}
