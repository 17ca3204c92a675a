use std::sync::Arc;

use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use parking_lot::Mutex;
use rand::Rng;
use ripcord_http::Rest;
use ripcord_model::gateway::{
    close_code_description, ClosePolicy, Command, ConnectionProperties, Event, Frame, Hello,
    Identify, Opcode, RequestGuildMembers, Resume, StatusUpdate, VoiceStateCommand,
};
use serde::Serialize;
use serde_json::Value;
use tokio::{
    net::TcpStream,
    task::JoinHandle,
    time::{interval, sleep, Duration, MissedTickBehavior},
};
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};

use crate::{
    limiter::{Cooldown, SlidingWindow},
    Encoding, GatewayConfig, GatewayError,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Sink = SplitSink<Socket, Message>;
type Stream = SplitStream<Socket>;

const MAX_FRAME: usize = 4096;
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(10);
const CONNECT_COOLDOWN: Duration = Duration::from_millis(5_100);
const IDENTIFY_GAP: Duration = Duration::from_millis(5_100);
const IDENTIFY_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

#[cfg(feature = "large-sharding")]
const IDENTIFY_LIMIT: usize = 2000;
#[cfg(not(feature = "large-sharding"))]
const IDENTIFY_LIMIT: usize = 1000;

/// Receives decoded dispatches from the receive loop.
///
/// Called inline right after the sequence number is advanced, so an
/// implementation sees events in arrival order; anything slow belongs in a
/// task it spawns itself.
pub trait Dispatch: Send + Sync + 'static {
    fn dispatch(&self, event: Event);
}

#[derive(Default)]
struct Session {
    id: Option<Box<str>>,
    sequence: u64,
    has_sequence: bool,
    received_ack: bool,
    should_disconnect: bool,
}

/// What the session loop decided the engine should do next.
enum Next {
    Resume,
    Reidentify,
    Stop,
    Fatal(GatewayError),
}

enum Incoming {
    Frame(Frame),
    Skip,
    Closed(u16, String),
}

/// The gateway engine: connect, hello, identify or resume, then the receive
/// loop with a heartbeat worker on the side, reconnecting by close-code
/// policy.
pub struct Gateway {
    config: GatewayConfig,
    rest: Arc<Rest>,
    handler: Arc<dyn Dispatch>,

    session: Mutex<Session>,
    cached_url: Mutex<Option<Box<str>>>,
    sink: tokio::sync::Mutex<Option<Sink>>,
    heartbeat: Mutex<Option<JoinHandle<()>>>,

    connect_cooldown: Cooldown,
    identify_limit: SlidingWindow,
    send_limit: SlidingWindow,
    status_limit: SlidingWindow,
}

impl Gateway {
    pub fn new(config: GatewayConfig, rest: Arc<Rest>, handler: Arc<dyn Dispatch>) -> Self {
        Self {
            config,
            rest,
            handler,
            session: Mutex::new(Session::default()),
            cached_url: Mutex::new(None),
            sink: tokio::sync::Mutex::new(None),
            heartbeat: Mutex::new(None),
            connect_cooldown: Cooldown::new(CONNECT_COOLDOWN),
            identify_limit: SlidingWindow::new(IDENTIFY_LIMIT, IDENTIFY_WINDOW, IDENTIFY_GAP),
            send_limit: SlidingWindow::new(12, Duration::from_secs(6), Duration::from_millis(100)),
            status_limit: SlidingWindow::new(5, Duration::from_secs(60), Duration::from_secs(1)),
        }
    }

    pub fn session_id(&self) -> Option<Box<str>> {
        self.session.lock().id.clone()
    }

    /// Runs until [`Self::disconnect`] or a fatal protocol/close error.
    pub async fn run(self: Arc<Self>) -> Result<(), GatewayError> {
        loop {
            if self.session.lock().should_disconnect {
                return Ok(());
            }

            let stream = match self.connect().await {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(?err, "connect failed, retrying");
                    *self.cached_url.lock() = None;
                    sleep(CONNECT_RETRY_DELAY).await;

                    continue;
                }
            };

            match Self::session_loop(&self, stream).await {
                Next::Stop => return Ok(()),
                Next::Fatal(err) => return Err(err),
                Next::Reidentify => {
                    self.session.lock().id = None;
                }
                Next::Resume => {
                    let resumable = self.session.lock().id.is_some();

                    if !resumable {
                        let delay = rand::thread_rng().gen_range(1.0..5.0);
                        debug!(delay, "reconnecting without a session");
                        sleep(Duration::from_secs_f64(delay)).await;
                    }
                }
            }
        }
    }

    /// Requests a shutdown and closes the socket; [`Self::run`] returns once
    /// the workers wind down.
    pub async fn disconnect(&self) {
        self.session.lock().should_disconnect = true;
        self.teardown().await;
    }

    /// Presence change, gated by the status limiter on top of the send
    /// limiter.
    pub async fn update_status(&self, status: StatusUpdate) -> Result<(), GatewayError> {
        self.status_limit.wait_for().await;
        self.send_command(Opcode::StatusUpdate, &status).await
    }

    pub async fn update_voice_state(&self, command: VoiceStateCommand) -> Result<(), GatewayError> {
        self.send_command(Opcode::VoiceStateUpdate, &command).await
    }

    pub async fn request_guild_members(
        &self,
        request: RequestGuildMembers,
    ) -> Result<(), GatewayError> {
        self.send_command(Opcode::RequestGuildMembers, &request).await
    }

    async fn connect(&self) -> Result<Stream, GatewayError> {
        self.connect_cooldown.wait_for().await;

        let base = {
            let cached = self.cached_url.lock().clone();

            match cached {
                Some(url) => url,
                None => {
                    let url: Box<str> = match &self.config.gateway_url {
                        Some(url) => url.as_str().into(),
                        None => self.rest.get_gateway().await?.into(),
                    };

                    *self.cached_url.lock() = Some(url.clone());

                    url
                }
            }
        };

        let url = format!(
            "{}/?v=6&encoding={}",
            base.trim_end_matches('/'),
            self.config.encoding.as_str(),
        );

        debug!(%url, "connecting");

        let (socket, _response) = connect_async(&url).await?;
        let (sink, stream) = socket.split();
        *self.sink.lock().await = Some(sink);

        Ok(stream)
    }

    async fn session_loop(gateway: &Arc<Self>, mut stream: Stream) -> Next {
        // the first frame must be hello
        let frame = loop {
            let message = match stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(err)) => {
                    warn!(?err, "socket failed before hello");

                    return Next::Resume;
                }
                None => return Next::Resume,
            };

            match classify(message) {
                Ok(Incoming::Frame(frame)) => break frame,
                Ok(Incoming::Skip) => {}
                Ok(Incoming::Closed(code, reason)) => return gateway.handle_close(code, &reason),
                Err(err) => return Next::Fatal(err),
            }
        };

        if frame.op != Opcode::Hello as u8 {
            let message = format!("expected hello, got opcode {}", frame.op);

            return Next::Fatal(GatewayError::Protocol(message.into_boxed_str()));
        }

        let hello: Hello = match serde_json::from_value(frame.d) {
            Ok(hello) => hello,
            Err(err) => {
                let message = format!("malformed hello payload: {err}");

                return Next::Fatal(GatewayError::Protocol(message.into_boxed_str()));
            }
        };

        debug!(interval = hello.heartbeat_interval, "hello received");

        gateway.session.lock().received_ack = true;
        Self::start_heartbeat(gateway, hello.heartbeat_interval);

        if let Err(err) = gateway.authenticate().await {
            gateway.teardown().await;

            return Next::Fatal(err);
        }

        let next = gateway.receive_loop(&mut stream).await;
        gateway.teardown().await;

        next
    }

    /// Resume when a session id survives, identify from scratch otherwise.
    async fn authenticate(&self) -> Result<(), GatewayError> {
        let resumable = {
            let session = self.session.lock();

            session
                .id
                .clone()
                .map(|id| (id, session.has_sequence.then_some(session.sequence)))
        };

        match resumable {
            Some((session_id, seq)) => {
                debug!(%session_id, "resuming");

                let resume = Resume {
                    token: self.config.token.clone(),
                    session_id: session_id.into(),
                    seq: seq.unwrap_or(0),
                };

                self.send_command(Opcode::Resume, &resume).await
            }
            None => {
                self.identify_limit.wait_for().await;
                debug!("identifying");

                let identify = Identify {
                    token: self.config.token.clone(),
                    properties: ConnectionProperties::default(),
                    compress: false,
                    large_threshold: self.config.large_threshold,
                    shard: self.config.shard,
                    presence: self
                        .config
                        .presence
                        .clone()
                        .or_else(|| Some(StatusUpdate::online())),
                };

                self.send_command(Opcode::Identify, &identify).await
            }
        }
    }

    async fn receive_loop(&self, stream: &mut Stream) -> Next {
        loop {
            let message = match stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(err)) => {
                    if self.session.lock().should_disconnect {
                        return Next::Stop;
                    }

                    warn!(?err, "socket error");

                    return Next::Resume;
                }
                None => {
                    if self.session.lock().should_disconnect {
                        return Next::Stop;
                    }

                    debug!("socket ended");

                    return Next::Resume;
                }
            };

            let frame = match classify(message) {
                Ok(Incoming::Frame(frame)) => frame,
                Ok(Incoming::Skip) => continue,
                Ok(Incoming::Closed(code, reason)) => return self.handle_close(code, &reason),
                Err(err) => {
                    warn!(?err, "undecodable frame");

                    continue;
                }
            };

            if let Some(next) = self.handle_frame(frame) {
                return next;
            }
        }
    }

    fn handle_frame(&self, frame: Frame) -> Option<Next> {
        match Opcode::from_u8(frame.op) {
            Some(Opcode::Dispatch) => {
                // advance the sequence before anything can observe the event
                if let Some(seq) = frame.s {
                    let mut session = self.session.lock();
                    session.sequence = seq;
                    session.has_sequence = true;
                }

                let Some(kind) = frame.t.as_deref() else {
                    warn!("dispatch frame without an event kind");

                    return None;
                };

                if kind == "READY" {
                    if let Some(id) = frame.d.get("session_id").and_then(Value::as_str) {
                        self.session.lock().id = Some(id.into());
                    }
                }

                match Event::from_parts(kind, frame.d) {
                    Ok(event) => {
                        trace!(kind = event.kind(), "dispatch");
                        self.handler.dispatch(event);
                    }
                    Err(err) => warn!(kind, ?err, "failed to decode dispatch"),
                }

                None
            }
            Some(Opcode::Reconnect) => {
                debug!("server requested reconnect");

                Some(Next::Resume)
            }
            Some(Opcode::InvalidSession) => {
                debug!("session invalidated by the server");

                Some(Next::Reidentify)
            }
            Some(Opcode::Heartbeat | Opcode::HeartbeatAck) => {
                self.session.lock().received_ack = true;

                None
            }
            _ => {
                trace!(op = frame.op, "ignoring frame");

                None
            }
        }
    }

    fn handle_close(&self, code: u16, reason: &str) -> Next {
        if self.session.lock().should_disconnect {
            return Next::Stop;
        }

        let reason: Box<str> = if reason.is_empty() {
            close_code_description(code).into()
        } else {
            reason.into()
        };

        match ClosePolicy::of(code) {
            ClosePolicy::Fatal => {
                error!(code, %reason, "gateway closed fatally");

                Next::Fatal(GatewayError::Closed { code, reason })
            }
            ClosePolicy::Reidentify => {
                debug!(code, %reason, "close reset the session");

                Next::Reidentify
            }
            ClosePolicy::Resume => {
                debug!(code, %reason, "close, resuming");

                Next::Resume
            }
        }
    }

    fn start_heartbeat(this: &Arc<Self>, interval_ms: u64) {
        let gateway = Arc::clone(this);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_millis(interval_ms.max(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let (acked, seq) = {
                    let mut session = gateway.session.lock();

                    if session.should_disconnect {
                        return;
                    }

                    let acked = session.received_ack;
                    session.received_ack = false;

                    (acked, session.has_sequence.then_some(session.sequence))
                };

                if !acked {
                    warn!("no heartbeat ack within the interval, forcing reconnect");
                    gateway.close_socket().await;

                    return;
                }

                if let Err(err) = gateway.send_command(Opcode::Heartbeat, &seq).await {
                    warn!(?err, "failed to send heartbeat");

                    return;
                }

                trace!("heartbeat sent");
            }
        });

        *this.heartbeat.lock() = Some(handle);
    }

    /// Every outbound frame passes the send limiter and the 4096 byte cap.
    async fn send_command<T: Serialize>(&self, op: Opcode, payload: &T) -> Result<(), GatewayError> {
        let message = self.encode_frame(op, payload)?;

        self.send_limit.wait_for().await;

        let mut sink = self.sink.lock().await;

        match sink.as_mut() {
            Some(sink) => sink.send(message).await.map_err(GatewayError::from),
            None => Err(GatewayError::Protocol("socket is not connected".into())),
        }
    }

    fn encode_frame<T: Serialize>(&self, op: Opcode, payload: &T) -> Result<Message, GatewayError> {
        let command = Command::new(op, payload);

        match self.config.encoding {
            Encoding::Json => {
                let text = serde_json::to_string(&command)
                    .map_err(|err| eyre::eyre!("failed to encode frame: {err}"))?;

                if text.len() > MAX_FRAME {
                    return Err(GatewayError::PacketTooLarge { size: text.len() });
                }

                Ok(Message::Text(text))
            }
            Encoding::Etf => {
                let bytes = ripcord_etf::to_bytes(&command)
                    .map_err(|err| eyre::eyre!("failed to encode frame: {err}"))?;

                if bytes.len() > MAX_FRAME {
                    return Err(GatewayError::PacketTooLarge { size: bytes.len() });
                }

                Ok(Message::Binary(bytes))
            }
        }
    }

    async fn close_socket(&self) {
        let mut sink = self.sink.lock().await;

        if let Some(mut sink) = sink.take() {
            let _ = sink.close().await;
        }
    }

    /// Stops the heartbeat worker and closes the socket; reconnects only
    /// happen after this finished.
    async fn teardown(&self) {
        let handle = self.heartbeat.lock().take();

        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }

        self.close_socket().await;
    }
}

/// Splits transport messages into frames, control noise, and closes; the
/// frame format follows the message type, text for JSON and binary for ETF.
fn classify(message: Message) -> Result<Incoming, GatewayError> {
    match message {
        Message::Text(text) => serde_json::from_str(&text)
            .map(Incoming::Frame)
            .map_err(|err| eyre::eyre!("bad json frame: {err}").into()),
        Message::Binary(bytes) => ripcord_etf::from_bytes(&bytes)
            .map(Incoming::Frame)
            .map_err(|err| eyre::eyre!("bad etf frame: {err}").into()),
        Message::Close(frame) => {
            let (code, reason) = frame
                .map(|frame| (u16::from(frame.code), frame.reason.into_owned()))
                .unwrap_or((1000, String::new()));

            Ok(Incoming::Closed(code, reason))
        }
        _ => Ok(Incoming::Skip),
    }
}
