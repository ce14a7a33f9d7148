use std::net::SocketAddr;
use std::time::Duration;

use doc_relay::{build_app, config::Config, ws::CloseReason, AppState};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::{connect_async, tungstenite::{self, Message}, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> (SocketAddr, AppState) {
    let state = AppState::new(Config::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_app(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

async fn connect(addr: SocketAddr, document_id: &str, user_id: &str) -> Client {
    let url = format!("ws://{addr}/ws?documentId={document_id}&userId={user_id}");
    let (ws, _) = connect_async(url).await.expect("ws connect");
    ws
}

/// Registration happens after the handshake completes, so wait for it.
async fn wait_for_sessions(state: &AppState, document_id: &str, expected: usize) {
    let start = Instant::now();
    while state.registry.session_count(document_id) != expected {
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "expected {expected} sessions in {document_id}, found {}",
            state.registry.session_count(document_id)
        );
        sleep(Duration::from_millis(10)).await;
    }
}

async fn next_message(ws: &mut Client) -> Message {
    timeout(Duration::from_secs(3), ws.next())
        .await
        .expect("timed out waiting for a message")
        .expect("stream ended")
        .expect("receive failed")
}

async fn assert_silent(ws: &mut Client) {
    assert!(
        timeout(Duration::from_millis(200), ws.next()).await.is_err(),
        "unexpected message"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn end_to_end_relay() {
    let (addr, state) = spawn_server().await;

    let mut a = connect(addr, "doc1", "A").await;
    let mut b = connect(addr, "doc1", "B").await;
    let mut c = connect(addr, "doc1", "C").await;
    wait_for_sessions(&state, "doc1", 3).await;

    a.send(Message::text("hello")).await.unwrap();
    assert_eq!(next_message(&mut b).await, Message::text("hello"));
    assert_eq!(next_message(&mut c).await, Message::text("hello"));
    assert_silent(&mut a).await;

    c.close(None).await.unwrap();
    wait_for_sessions(&state, "doc1", 2).await;

    a.send(Message::text("world")).await.unwrap();
    assert_eq!(next_message(&mut b).await, Message::text("world"));
    assert_silent(&mut a).await;

    let sessions = state.registry.sessions("doc1");
    let peers: Vec<_> = sessions
        .iter()
        .find(|s| s.user_id() == "A")
        .map(|a| state.registry.peers_except("doc1", a.id()))
        .unwrap();
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].user_id(), "B");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn binary_frames_and_document_isolation() {
    let (addr, state) = spawn_server().await;

    let mut a = connect(addr, "doc1", "A").await;
    let mut b = connect(addr, "doc1", "B").await;
    let mut other = connect(addr, "doc2", "Z").await;
    wait_for_sessions(&state, "doc1", 2).await;
    wait_for_sessions(&state, "doc2", 1).await;

    let payload = vec![0u8, 255, 1, 128, 64];
    a.send(Message::binary(payload.clone())).await.unwrap();
    assert_eq!(next_message(&mut b).await, Message::binary(payload));
    assert_silent(&mut other).await;

    other.send(Message::text("only me")).await.unwrap();
    assert_silent(&mut a).await;
    assert_silent(&mut b).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn path_form_attaches_to_the_named_document() {
    let (addr, state) = spawn_server().await;

    let mut a = connect(addr, "doc1", "A").await;
    let (mut b, _) = connect_async(format!("ws://{addr}/ws/doc1?userId=B")).await.unwrap();
    wait_for_sessions(&state, "doc1", 2).await;

    b.send(Message::text("via path")).await.unwrap();
    assert_eq!(next_message(&mut a).await, Message::text("via path"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_identifiers_reject_the_handshake() {
    let (addr, state) = spawn_server().await;

    for query in ["userId=u1", "documentId=doc1", ""] {
        let err = connect_async(format!("ws://{addr}/ws?{query}")).await.unwrap_err();
        match err {
            tungstenite::Error::Http(response) => assert_eq!(response.status().as_u16(), 400),
            other => panic!("unexpected error for '{query}': {other}"),
        }
    }
    assert_eq!(state.registry.connection_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_closes_connected_clients() {
    let (addr, state) = spawn_server().await;

    let mut a = connect(addr, "doc1", "A").await;
    wait_for_sessions(&state, "doc1", 1).await;

    assert_eq!(state.lifecycle.close_all(CloseReason::Shutdown), 1);
    assert_eq!(state.registry.connection_count(), 0);

    let ended = timeout(Duration::from_secs(3), async {
        loop {
            match a.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(ended.is_ok(), "client was not disconnected");
}
