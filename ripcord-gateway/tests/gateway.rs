//! Gateway engine behavior against a scripted loopback socket server.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use ripcord_gateway::{Dispatch, Gateway, GatewayConfig};
use ripcord_http::Rest;
use ripcord_model::gateway::Event;
use serde_json::{json, Value};
use tokio::{
    net::TcpListener,
    sync::mpsc::{self, UnboundedSender},
    time::{timeout, Duration},
};
use tokio_tungstenite::{accept_async, tungstenite::Message};

struct Noop;

impl Dispatch for Noop {
    fn dispatch(&self, _event: Event) {}
}

fn text(value: Value) -> Message {
    Message::Text(value.to_string())
}

fn hello() -> Message {
    text(json!({ "op": 10, "d": { "heartbeat_interval": 60_000 } }))
}

fn ready(session_id: &str) -> Message {
    text(json!({
        "op": 0,
        "s": 1,
        "t": "READY",
        "d": {
            "v": 6,
            "user": { "id": "1", "username": "bot" },
            "session_id": session_id,
            "guilds": [],
            "private_channels": [],
        },
    }))
}

async fn gateway_for(port: u16) -> (Arc<Gateway>, tokio::task::JoinHandle<()>) {
    // the REST endpoint is never contacted, the socket url is overridden
    let rest = Arc::new(Rest::with_endpoint("token", "http://127.0.0.1:9/api/v6"));

    let config = GatewayConfig::new("secret-token").gateway_url(format!("ws://127.0.0.1:{port}"));
    let gateway = Arc::new(Gateway::new(config, rest, Arc::new(Noop)));

    let runner = {
        let gateway = Arc::clone(&gateway);

        tokio::spawn(async move {
            let _ = gateway.run().await;
        })
    };

    (gateway, runner)
}

async fn recv_frame(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out waiting for a client frame")
        .expect("server task ended")
}

/// Forwards every text frame the client sends into the channel.
fn pump_frames(tx: UnboundedSender<Value>) -> impl FnMut(Message) -> bool {
    move |message| match message {
        Message::Text(frame) => {
            let value = serde_json::from_str(&frame).expect("client sent invalid json");

            tx.send(value).is_ok()
        }
        Message::Close(_) => false,
        _ => true,
    }
}

#[tokio::test]
async fn hello_prompts_identify() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, mut rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = accept_async(stream).await.unwrap();
        socket.send(hello()).await.unwrap();

        let mut pump = pump_frames(tx);

        while let Some(Ok(message)) = socket.next().await {
            if !pump(message) {
                break;
            }
        }
    });

    let (gateway, runner) = gateway_for(port).await;

    let identify = recv_frame(&mut rx).await;
    assert_eq!(identify["op"], 2);
    assert_eq!(identify["d"]["token"], "secret-token");
    assert_eq!(identify["d"]["shard"], json!([0, 1]));
    assert_eq!(identify["d"]["presence"]["status"], "online");

    gateway.disconnect().await;
    timeout(Duration::from_secs(5), runner).await.unwrap().unwrap();
}

#[tokio::test]
async fn invalid_session_forces_a_fresh_identify() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, mut rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        // first connection: install a session, then invalidate it
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = accept_async(stream).await.unwrap();
        socket.send(hello()).await.unwrap();

        let mut pump = pump_frames(tx.clone());
        if let Some(Ok(message)) = socket.next().await {
            pump(message);
        }

        socket.send(ready("sess-1")).await.unwrap();
        socket
            .send(text(json!({ "op": 9, "d": false })))
            .await
            .unwrap();

        // second connection: whatever authentication the client now picks
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = accept_async(stream).await.unwrap();
        socket.send(hello()).await.unwrap();

        let mut pump = pump_frames(tx);

        while let Some(Ok(message)) = socket.next().await {
            if !pump(message) {
                break;
            }
        }
    });

    let (gateway, runner) = gateway_for(port).await;

    let first = recv_frame(&mut rx).await;
    assert_eq!(first["op"], 2);

    // the reconnect after the invalidated session must identify, not resume
    let second = recv_frame(&mut rx).await;
    assert_eq!(second["op"], 2, "expected identify after invalid session");
    assert_eq!(gateway.session_id(), None);

    gateway.disconnect().await;
    timeout(Duration::from_secs(5), runner).await.unwrap().unwrap();
}

#[tokio::test]
async fn missed_heartbeat_ack_reconnects_with_resume() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, mut rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        // fast heartbeat, and no acks ever sent back
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = accept_async(stream).await.unwrap();
        socket
            .send(text(json!({ "op": 10, "d": { "heartbeat_interval": 50 } })))
            .await
            .unwrap();

        let mut pump = pump_frames(tx.clone());
        if let Some(Ok(message)) = socket.next().await {
            pump(message);
        }

        socket.send(ready("sess-1")).await.unwrap();

        while let Some(Ok(message)) = socket.next().await {
            if !pump(message) {
                break;
            }
        }

        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = accept_async(stream).await.unwrap();
        socket.send(hello()).await.unwrap();

        let mut pump = pump_frames(tx);

        while let Some(Ok(message)) = socket.next().await {
            if !pump(message) {
                break;
            }
        }
    });

    let (gateway, runner) = gateway_for(port).await;

    let identify = recv_frame(&mut rx).await;
    assert_eq!(identify["op"], 2);

    // one heartbeat goes out, its ack never arrives, the next tick forces a
    // reconnect that resumes the installed session
    let mut frame = recv_frame(&mut rx).await;

    while frame["op"] == 1 {
        frame = recv_frame(&mut rx).await;
    }

    assert_eq!(frame["op"], 6, "expected resume after missed ack");
    assert_eq!(frame["d"]["session_id"], "sess-1");
    assert_eq!(frame["d"]["seq"], 1);

    gateway.disconnect().await;
    timeout(Duration::from_secs(5), runner).await.unwrap().unwrap();
}
