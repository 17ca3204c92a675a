//! A synthesized gateway session exercising the full client: hello, ready,
//! message create, reaction add, message delete, with the cache observed at
//! each step.

use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use ripcord::{model::gateway::Event, model::Snowflake, Client, EventHandler};
use serde_json::{json, Value};
use tokio::{
    net::TcpListener,
    sync::mpsc,
    time::{sleep, timeout, Duration},
};
use tokio_tungstenite::{accept_async, tungstenite::Message};

struct Recorder {
    kinds: Arc<Mutex<Vec<String>>>,
}

#[ripcord::async_trait]
impl EventHandler for Recorder {
    async fn event(&self, event: Event) {
        self.kinds.lock().unwrap().push(event.kind().to_owned());
    }
}

fn dispatch(s: u64, kind: &str, d: Value) -> Message {
    Message::Text(json!({ "op": 0, "s": s, "t": kind, "d": d }).to_string())
}

async fn wait_until(what: &str, mut check: impl FnMut() -> bool) {
    let poll = async {
        while !check() {
            sleep(Duration::from_millis(10)).await;
        }
    };

    timeout(Duration::from_secs(5), poll)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

#[tokio::test]
async fn session_feeds_the_cache_in_order() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    // the server walks through the session one step per command
    let (step_tx, mut step_rx) = mpsc::unbounded_channel::<Message>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = accept_async(stream).await.unwrap();

        socket
            .send(Message::Text(
                json!({ "op": 10, "d": { "heartbeat_interval": 60_000 } }).to_string(),
            ))
            .await
            .unwrap();

        // the identify
        let _ = socket.next().await;

        while let Some(message) = step_rx.recv().await {
            if socket.send(message).await.is_err() {
                break;
            }
        }

        // keep the socket open until the client closes it
        while let Some(Ok(message)) = socket.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    });

    let kinds = Arc::new(Mutex::new(Vec::new()));

    let client = Client::builder("token")
        .rest_endpoint("http://127.0.0.1:9/api/v6")
        .gateway_url(format!("ws://127.0.0.1:{port}"))
        .build(Arc::new(Recorder {
            kinds: Arc::clone(&kinds),
        }));

    let runner = {
        let gateway = Arc::clone(client.gateway());

        tokio::spawn(async move { gateway.run().await })
    };

    let cache = Arc::clone(client.cache());

    step_tx
        .send(dispatch(
            1,
            "READY",
            json!({
                "v": 6,
                "user": { "id": "1", "username": "bot" },
                "session_id": "sess-e2e",
                "guilds": [],
                "private_channels": [],
            }),
        ))
        .unwrap();

    wait_until("ready snapshot", || cache.ready().is_some()).await;
    assert_eq!(&*cache.ready().unwrap().session_id, "sess-e2e");

    step_tx
        .send(dispatch(
            2,
            "MESSAGE_CREATE",
            json!({
                "id": "10",
                "channel_id": "20",
                "content": "hello there",
                "author": { "id": "30", "username": "someone" },
            }),
        ))
        .unwrap();

    wait_until("cached message", || cache.messages.has(Snowflake::new(10))).await;
    assert_eq!(cache.messages.len(), 1);

    step_tx
        .send(dispatch(
            3,
            "MESSAGE_REACTION_ADD",
            json!({
                "user_id": "30",
                "channel_id": "20",
                "message_id": "10",
                "emoji": { "id": null, "name": "👀" },
            }),
        ))
        .unwrap();

    wait_until("reaction", || {
        cache
            .messages
            .get(Snowflake::new(10))
            .is_some_and(|message| message.reactions.len() == 1)
    })
    .await;

    let message = cache.messages.get(Snowflake::new(10)).unwrap();
    assert_eq!(message.reactions[0].count, 1);
    assert_eq!(message.reactions[0].emoji.name, "👀");

    step_tx
        .send(dispatch(
            4,
            "MESSAGE_DELETE",
            json!({ "id": "10", "channel_id": "20" }),
        ))
        .unwrap();

    wait_until("message removal", || cache.messages.is_empty()).await;

    // handlers saw every dispatch as well
    wait_until("handler deliveries", || kinds.lock().unwrap().len() == 4).await;
    assert_eq!(
        &*kinds.lock().unwrap(),
        &["READY", "MESSAGE_CREATE", "MESSAGE_REACTION_ADD", "MESSAGE_DELETE"],
    );

    client.disconnect().await;
    let result = timeout(Duration::from_secs(5), runner).await.unwrap().unwrap();
    assert!(result.is_ok());
}
