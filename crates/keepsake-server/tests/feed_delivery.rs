//! Drives a real listener end to end: HTTP inserts on one side, feed
//! subscribers on the other.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use keepsake_db::Database;
use keepsake_server::feed::Feed;
use keepsake_types::events::FeedEvent;
use keepsake_types::models::Message;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server(db: Database) -> SocketAddr {
    let app = keepsake_server::app(db, Feed::new());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

fn open_db(dir: &TempDir) -> Database {
    Database::open(&dir.path().join("keepsake.db")).expect("open db")
}

fn seed(path: &Path, rows: &[(i64, &str, &str, &str)]) {
    let db = Database::open(path).expect("open db for seeding");
    db.with_conn(|conn| {
        for (id, name, message, created_at) in rows {
            conn.execute(
                "INSERT INTO messages (id, name, message, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, name, message, created_at),
            )?;
        }
        Ok(())
    })
    .expect("seed rows");
}

async fn connect_feed(addr: SocketAddr) -> Socket {
    let (socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/feed"))
        .await
        .expect("connect to /feed");
    // Give the upgraded connection a moment to register its subscription
    // before anything is published.
    sleep(Duration::from_millis(50)).await;
    socket
}

async fn next_event(socket: &mut Socket) -> FeedEvent {
    loop {
        let frame = timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a feed event")
            .expect("feed stream ended")
            .expect("feed stream errored");
        match frame {
            tungstenite::Message::Text(text) => {
                return serde_json::from_str(&text).expect("decode feed event");
            }
            tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_) => continue,
            other => panic!("unexpected feed frame: {other:?}"),
        }
    }
}

async fn post_message(addr: SocketAddr, name: &str, message: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/messages"))
        .json(&serde_json::json!({ "name": name, "message": message }))
        .send()
        .await
        .expect("POST /messages")
}

#[tokio::test]
async fn post_inserts_and_acks_the_stored_row() {
    let dir = TempDir::new().expect("temp dir");
    let addr = spawn_server(open_db(&dir)).await;

    let first = post_message(addr, "Alice", "First smile!").await;
    assert_eq!(first.status(), reqwest::StatusCode::CREATED);
    let first: Message = first.json().await.expect("ack body");

    let second = post_message(addr, "Bob", "Hi").await;
    let second: Message = second.json().await.expect("ack body");

    assert!(first.id > 0);
    assert!(second.id > first.id, "ids must be strictly increasing");
    assert_eq!(first.name, "Alice");
    assert_eq!(first.message, "First smile!");

    // Both rows are durable and readable back.
    let listed: Vec<Message> = reqwest::get(format!("http://{addr}/messages"))
        .await
        .expect("GET /messages")
        .json()
        .await
        .expect("list body");
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn every_post_reaches_every_subscriber() {
    let dir = TempDir::new().expect("temp dir");
    let addr = spawn_server(open_db(&dir)).await;

    let mut first = connect_feed(addr).await;
    let mut second = connect_feed(addr).await;

    let ack: Message = post_message(addr, "Alice", "First smile!")
        .await
        .json()
        .await
        .expect("ack body");

    let FeedEvent::MessageCreate { message } = next_event(&mut first).await;
    assert_eq!(message, ack);
    let FeedEvent::MessageCreate { message } = next_event(&mut second).await;
    assert_eq!(message, ack);
}

#[tokio::test]
async fn empty_fields_are_rejected_and_publish_nothing() {
    let dir = TempDir::new().expect("temp dir");
    let addr = spawn_server(open_db(&dir)).await;

    let mut subscriber = connect_feed(addr).await;

    for (name, message) in [("", "hi"), ("A", ""), ("", ""), ("   ", "hi"), ("A", "\t")] {
        let resp = post_message(addr, name, message).await;
        assert_eq!(
            resp.status(),
            reqwest::StatusCode::BAD_REQUEST,
            "name={name:?} message={message:?}"
        );
    }

    // Nothing was inserted...
    let listed: Vec<Message> = reqwest::get(format!("http://{addr}/messages"))
        .await
        .expect("GET /messages")
        .json()
        .await
        .expect("list body");
    assert!(listed.is_empty());

    // ...and the first event the subscriber ever sees is the next good row.
    post_message(addr, "Alice", "First smile!").await;
    let FeedEvent::MessageCreate { message } = next_event(&mut subscriber).await;
    assert_eq!(message.name, "Alice");
}

#[tokio::test]
async fn list_returns_rows_newest_first() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("keepsake.db");
    // Seed out of chronological order with distinct timestamps: the response
    // order must come from created_at, not insertion order.
    seed(
        &path,
        &[
            (1, "B", "yo", "2024-01-01T00:00:00Z"),
            (3, "C", "hey", "2024-01-03T00:00:00Z"),
            (2, "A", "hi", "2024-01-02T00:00:00Z"),
        ],
    );
    let addr = spawn_server(Database::open(&path).expect("open db")).await;

    let listed: Vec<Message> = reqwest::get(format!("http://{addr}/messages"))
        .await
        .expect("GET /messages")
        .json()
        .await
        .expect("list body");

    let ids: Vec<i64> = listed.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![3, 2, 1]);
}

#[tokio::test]
async fn initial_load_scenario_matches_the_store() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("keepsake.db");
    seed(
        &path,
        &[
            (2, "A", "hi", "2024-01-02T00:00:00Z"),
            (1, "B", "yo", "2024-01-01T00:00:00Z"),
        ],
    );
    let addr = spawn_server(Database::open(&path).expect("open db")).await;

    let listed: Vec<Message> = reqwest::get(format!("http://{addr}/messages"))
        .await
        .expect("GET /messages")
        .json()
        .await
        .expect("list body");

    assert_eq!(listed.len(), 2);
    assert_eq!((listed[0].id, listed[0].name.as_str()), (2, "A"));
    assert_eq!((listed[1].id, listed[1].name.as_str()), (1, "B"));
}
