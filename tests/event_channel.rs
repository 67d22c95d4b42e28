use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use yx_client::event::{EventNotificationChannel, EventReceiver, EventResponse};
use yx_client::{Bytes32, ChannelState, ErrorCode, YxResult};

type ServerSocket = WebSocketStream<TcpStream>;

/// Accept connections forever, handing each socket to `handler`
async fn serve<F, Fut>(handler: F) -> String
where
    F: Fn(ServerSocket) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let handler = handler.clone();
            tokio::spawn(async move {
                if let Ok(ws) = accept_async(stream).await {
                    handler(ws).await;
                }
            });
        }
    });
    format!("ws://{}/v1/event_notification", addr)
}

/// Answers every query with block 42, preceded by a reply nobody asked for
async fn responder(mut ws: ServerSocket) {
    while let Some(Ok(msg)) = ws.next().await {
        let Message::Text(text) = msg else { continue };
        let request: Value = serde_json::from_str(text.as_str()).unwrap();

        let stray = json!({
            "request_id": "9999",
            "name": "tx_irreversibility",
            "result": {"tx_id": "00", "block_num": 1}
        });
        let reply = json!({
            "request_id": request["request_id"],
            "name": request["name"],
            "result": {"tx_id": request["parameters"]["tx_id"], "block_num": 42}
        });
        for frame in [stray, reply] {
            if ws.send(Message::Text(frame.to_string().into())).await.is_err() {
                return;
            }
        }
    }
}

/// Reads `n` queries without answering, then closes
async fn close_after(mut ws: ServerSocket, n: usize) {
    let mut seen = 0;
    while let Some(Ok(msg)) = ws.next().await {
        if msg.is_text() {
            seen += 1;
            if seen == n {
                let _ = ws.close(None).await;
                return;
            }
        }
    }
}

/// Never answers
async fn silent(mut ws: ServerSocket) {
    while let Some(Ok(_)) = ws.next().await {}
}

/// Answers the first query with a binary frame
async fn binary_reply(mut ws: ServerSocket) {
    while let Some(Ok(msg)) = ws.next().await {
        if msg.is_text() {
            let _ = ws.send(Message::Binary(vec![1u8, 2, 3].into())).await;
        }
    }
}

fn channel(url: String) -> EventNotificationChannel {
    EventNotificationChannel::with_endpoint(url, Duration::from_secs(5), Duration::from_millis(300))
}

fn tx_id() -> Bytes32 {
    Bytes32([0xab; 32])
}

async fn outcome(rx: EventReceiver) -> YxResult<EventResponse> {
    tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .expect("completion within 5s")
        .expect("sender completed, not dropped")
}

async fn wait_for_state(ch: &EventNotificationChannel, state: ChannelState) {
    for _ in 0..100 {
        if ch.state() == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("channel stuck in {:?}", ch.state());
}

#[tokio::test]
async fn queries_get_distinct_ids_and_matching_replies() {
    let ch = channel(serve(responder).await);
    ch.subscribe().await.unwrap();
    assert_eq!(ch.state(), ChannelState::Subscribed);

    let (id1, rx1) = ch.check_transaction_irreversibility(&tx_id(), None).await.unwrap();
    let (id2, rx2) = ch.check_transaction_irreversibility(&tx_id(), Some(41)).await.unwrap();
    assert_eq!(id1, "1");
    assert_eq!(id2, "2");

    let first = outcome(rx1).await.unwrap();
    let second = outcome(rx2).await.unwrap();
    assert_eq!(first.request_id, "1");
    assert_eq!(second.request_id, "2");
    assert_eq!(first.irreversibility().unwrap().block_num, 42);
    assert_eq!(second.irreversibility().unwrap().tx_id, tx_id().to_hex());

    let confirmed = ch.wait_for_irreversibility(&tx_id(), None).await.unwrap();
    assert_eq!(confirmed.block_num, 42);
    assert_eq!(ch.pending_count(), 0);
}

#[tokio::test]
async fn ids_continue_across_resubscribe() {
    let ch = channel(serve(responder).await);
    ch.subscribe().await.unwrap();
    let (id, rx) = ch.check_transaction_irreversibility(&tx_id(), None).await.unwrap();
    assert_eq!(id, "1");
    outcome(rx).await.unwrap();

    ch.unsubscribe().await.unwrap();
    assert_eq!(ch.state(), ChannelState::Disconnected);
    let err = ch
        .check_transaction_irreversibility(&tx_id(), None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ChannelState);

    ch.subscribe().await.unwrap();
    let (id, rx) = ch.check_transaction_irreversibility(&tx_id(), None).await.unwrap();
    assert_eq!(id, "2");
    outcome(rx).await.unwrap();
}

#[tokio::test]
async fn subscribe_twice_is_caller_error() {
    let ch = channel(serve(silent).await);
    ch.subscribe().await.unwrap();
    let err = ch.subscribe().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ChannelState);
    assert_eq!(ch.state(), ChannelState::Subscribed);
}

#[tokio::test]
async fn remote_close_fails_every_pending_query_once() {
    let ch = channel(serve(|ws| close_after(ws, 3)).await);
    ch.subscribe().await.unwrap();

    let mut receivers = Vec::new();
    for _ in 0..3 {
        let (_, rx) = ch.check_transaction_irreversibility(&tx_id(), None).await.unwrap();
        receivers.push(rx);
    }

    for rx in receivers {
        let err = outcome(rx).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ChannelClosed);
    }
    assert_eq!(ch.pending_count(), 0);
    wait_for_state(&ch, ChannelState::Disconnected).await;
}

#[tokio::test]
async fn binary_frame_is_fatal() {
    let ch = channel(serve(binary_reply).await);
    ch.subscribe().await.unwrap();

    let (_, rx) = ch.check_transaction_irreversibility(&tx_id(), None).await.unwrap();
    let err = outcome(rx).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ProtocolViolation);
    assert_eq!(ch.pending_count(), 0);
    wait_for_state(&ch, ChannelState::Disconnected).await;
}

#[tokio::test]
async fn timeout_removes_pending_entry() {
    let ch = channel(serve(silent).await);
    ch.subscribe().await.unwrap();

    let err = ch.wait_for_irreversibility(&tx_id(), None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Timeout);
    assert_eq!(ch.pending_count(), 0);
    assert_eq!(ch.state(), ChannelState::Subscribed);
}

#[tokio::test]
async fn unsubscribe_fails_outstanding_queries() {
    let ch = channel(serve(silent).await);
    ch.subscribe().await.unwrap();
    let (_, rx) = ch.check_transaction_irreversibility(&tx_id(), None).await.unwrap();

    ch.unsubscribe().await.unwrap();
    let err = outcome(rx).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ChannelClosed);
    assert_eq!(ch.pending_count(), 0);
    assert_eq!(ch.state(), ChannelState::Disconnected);
}

#[tokio::test]
async fn abandoned_queries_are_pruned() {
    let ch = channel(serve(silent).await);
    ch.subscribe().await.unwrap();

    let (_, rx) = ch.check_transaction_irreversibility(&tx_id(), None).await.unwrap();
    drop(rx);
    assert_eq!(ch.pending_count(), 1);

    let (id, _rx) = ch.check_transaction_irreversibility(&tx_id(), None).await.unwrap();
    assert_eq!(id, "2");
    assert_eq!(ch.pending_count(), 1);
}

/// Closes right after the handshake
async fn hang_up(mut ws: ServerSocket) {
    let _ = ws.close(None).await;
}

#[tokio::test]
async fn immediate_hang_up_ends_disconnected() {
    let ch = channel(serve(hang_up).await);
    // The close may land before or after subscribe returns
    if let Err(err) = ch.subscribe().await {
        assert_eq!(err.code, ErrorCode::ChannelClosed);
    }
    wait_for_state(&ch, ChannelState::Disconnected).await;

    // A settled channel accepts a fresh subscribe
    if let Err(err) = ch.subscribe().await {
        assert_eq!(err.code, ErrorCode::ChannelClosed);
    }
    wait_for_state(&ch, ChannelState::Disconnected).await;
}
