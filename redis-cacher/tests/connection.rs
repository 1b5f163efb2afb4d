//! Wire-level tests against an in-process fake server
//!
//! The fake speaks just enough RESP2 to cover the handshake, plain
//! request/reply commands, a dropped socket and a subscription that loses
//! its connection once.

use bytes::{Buf, BytesMut};
use redis_cacher::protocol::{RespDecoder, RespEncoder};
use redis_cacher::{
    Client, Message, Options, PoolStats, RedisError, RespValue, SubscriptionState,
};
use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

#[derive(Default)]
struct State {
    password: Option<String>,
    log: Mutex<Vec<Vec<String>>>,
    store: Mutex<HashMap<String, String>>,
    accepted: AtomicUsize,
    subscriptions: AtomicUsize,
}

impl State {
    fn commands(&self) -> Vec<Vec<String>> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line[0] != "PING")
            .cloned()
            .collect()
    }
}

enum Reply {
    Frames(Vec<RespValue>),
    Delayed(Duration, Vec<RespValue>),
    FramesThenClose(Vec<RespValue>),
    Close,
}

fn ok() -> Reply {
    Reply::Frames(vec![RespValue::SimpleString("OK".to_string())])
}

fn one(value: RespValue) -> Reply {
    Reply::Frames(vec![value])
}

fn handle(state: &State, parts: &[String]) -> Reply {
    let args = &parts[1..];
    match parts[0].as_str() {
        "AUTH" => match state.password {
            Some(ref expected) if expected == &args[0] => ok(),
            _ => one(RespValue::Error(
                "WRONGPASS invalid username-password pair".to_string(),
            )),
        },
        "SELECT" | "EXPIRE" => ok(),
        "PING" => one(RespValue::SimpleString("PONG".to_string())),
        "SET" => {
            state
                .store
                .lock()
                .unwrap()
                .insert(args[0].clone(), args[1].clone());
            ok()
        }
        "SETEX" => {
            state
                .store
                .lock()
                .unwrap()
                .insert(args[0].clone(), args[2].clone());
            ok()
        }
        "GET" => one(
            state
                .store
                .lock()
                .unwrap()
                .get(&args[0])
                .map_or(RespValue::Null, |v| RespValue::from(v.as_str())),
        ),
        "ECHO" => one(RespValue::from(args[0].as_str())),
        "SLOW" => Reply::Delayed(
            Duration::from_millis(200),
            vec![RespValue::SimpleString("OK".to_string())],
        ),
        "CRASH" => Reply::Close,
        "SUBSCRIBE" => {
            let attempt = state.subscriptions.fetch_add(1, Ordering::AcqRel) + 1;
            let frames = vec![
                RespValue::Array(vec![
                    RespValue::from("subscribe"),
                    RespValue::from(args[0].as_str()),
                    RespValue::Integer(1),
                ]),
                RespValue::Array(vec![
                    RespValue::from("message"),
                    RespValue::from(args[0].as_str()),
                    RespValue::from(format!("hello-{attempt}")),
                ]),
            ];
            if attempt == 1 {
                Reply::FramesThenClose(frames)
            } else {
                Reply::Frames(frames)
            }
        }
        _ => one(RespValue::Error("ERR unknown command".to_string())),
    }
}

async fn read_frame(socket: &mut TcpStream, buf: &mut BytesMut) -> Option<RespValue> {
    loop {
        let mut cursor = Cursor::new(&buf[..]);
        match RespDecoder::decode(&mut cursor) {
            Ok(Some(frame)) => {
                let consumed = cursor.position() as usize;
                buf.advance(consumed);
                return Some(frame);
            }
            Ok(None) => {}
            Err(_) => return None,
        }
        match socket.read_buf(buf).await {
            Ok(0) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

async fn serve(mut socket: TcpStream, state: Arc<State>) {
    let mut buf = BytesMut::new();
    while let Some(frame) = read_frame(&mut socket, &mut buf).await {
        let parts: Vec<String> = match frame.into_array() {
            Ok(items) => items.iter().map(|p| p.as_string().unwrap()).collect(),
            Err(_) => return,
        };
        state.log.lock().unwrap().push(parts.clone());

        let (frames, close) = match handle(&state, &parts) {
            Reply::Frames(frames) => (frames, false),
            Reply::Delayed(delay, frames) => {
                tokio::time::sleep(delay).await;
                (frames, false)
            }
            Reply::FramesThenClose(frames) => (frames, true),
            Reply::Close => return,
        };
        let mut out = BytesMut::new();
        for frame in &frames {
            RespEncoder::encode(frame, &mut out);
        }
        if socket.write_all(&out).await.is_err() || close {
            return;
        }
    }
}

async fn start(password: Option<&str>) -> (SocketAddr, Arc<State>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(State {
        password: password.map(str::to_string),
        ..Default::default()
    });

    let server_state = state.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            server_state.accepted.fetch_add(1, Ordering::AcqRel);
            tokio::spawn(serve(socket, server_state.clone()));
        }
    });
    (addr, state)
}

fn line(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

#[tokio::test]
async fn test_handshake_then_set_get() {
    let (addr, state) = start(Some("secret")).await;
    let client = Client::configure(
        Options::new(addr.to_string())
            .with_password("secret")
            .with_database(2)
            .with_prefix("test_"),
    )
    .unwrap();

    client.set("name", "ann", 0).await.unwrap();
    assert_eq!(client.get_string("name").await.unwrap(), "ann");
    assert!(client.get_string("other").await.unwrap_err().is_nil());

    assert_eq!(
        state.commands(),
        vec![
            line(&["AUTH", "secret"]),
            line(&["SELECT", "2"]),
            line(&["SET", "test_name", "ann"]),
            line(&["GET", "test_name"]),
            line(&["GET", "test_other"]),
        ]
    );
    // One session served every command.
    assert_eq!(state.accepted.load(Ordering::Acquire), 1);
    client.shutdown();
}

#[tokio::test]
async fn test_wrong_password_is_connection_error() {
    let (addr, _state) = start(Some("secret")).await;
    let client =
        Client::configure(Options::new(addr.to_string()).with_password("guess")).unwrap();

    assert!(matches!(
        client.get("k").await,
        Err(RedisError::Connection(_))
    ));
    assert_eq!(client.pool_stats().active, 0);
}

#[tokio::test]
async fn test_dropped_socket_is_not_reused() {
    let (addr, state) = start(None).await;
    let client = Client::configure(Options::new(addr.to_string())).unwrap();

    client.set("k", 1, 0).await.unwrap();
    assert!(matches!(
        client.execute("CRASH", &[]).await,
        Err(RedisError::Connection(_))
    ));
    assert_eq!(client.pool_stats().idle, 0);

    assert_eq!(client.get_int("k").await.unwrap(), 1);
    assert_eq!(state.accepted.load(Ordering::Acquire), 2);
}

#[tokio::test]
async fn test_server_error_reply() {
    let (addr, _state) = start(None).await;
    let client = Client::configure(Options::new(addr.to_string())).unwrap();

    assert!(matches!(
        client.execute("NOPE", &[]).await,
        Err(RedisError::Server(_))
    ));
    assert_eq!(client.pool_stats().idle, 1);
}

#[tokio::test]
async fn test_subscription_survives_dropped_socket() {
    let (addr, state) = start(None).await;
    let client = Client::configure(
        Options::new(addr.to_string()).with_subscribe_retry(Duration::from_millis(20)),
    )
    .unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = client
        .subscribe(&["events"], move |message: Message| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(message.payload_str().unwrap().to_string());
            }
        })
        .unwrap();

    let mut received = Vec::new();
    for _ in 0..2 {
        let payload = timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        received.push(payload);
    }
    received.sort();
    assert_eq!(received, vec!["hello-1", "hello-2"]);

    timeout(Duration::from_secs(2), subscription.wait_active())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subscription.state(), SubscriptionState::Active);
    assert!(subscription.reconnects() >= 1);
    assert_eq!(state.subscriptions.load(Ordering::Acquire), 2);
}

#[tokio::test]
async fn test_cancelled_request_does_not_leak_its_reply() {
    let (addr, state) = start(None).await;
    let client = Client::configure(Options::new(addr.to_string())).unwrap();

    let cancelled = timeout(Duration::from_millis(50), client.execute("SLOW", &[])).await;
    assert!(cancelled.is_err());
    assert_eq!(client.pool_stats(), PoolStats { active: 0, idle: 0 });

    // Let the late reply land on the abandoned socket.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let reply = client
        .execute("ECHO", &[RespValue::from("mine")])
        .await
        .unwrap();
    assert_eq!(reply, RespValue::from("mine"));
    assert_eq!(state.accepted.load(Ordering::Acquire), 2);
}
