//! Transport contract and the WebSocket implementation of it

use crate::{
    data::{ClientConfig, ConnectRequest},
    error::SdkError,
    parser::{self, EnginePacket, Handshake, SocketPacket},
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, Interval};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use url::Url;

/// Notification raised by a transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected(Value),
    Message { kind: String, payload: Value },
    Disconnected(String),
}

/// Everything the channel's dispatch loop consumes, in arrival order
#[derive(Debug)]
pub(crate) enum ChannelSignal {
    Transport { epoch: u64, event: TransportEvent },
    RetryDue { generation: u64 },
}

/// Handle a transport uses to report back to the channel that issued the
/// connect. Each sink is bound to one epoch; once the channel has moved on
/// to a newer socket, anything sent through an older sink is discarded.
#[derive(Debug, Clone)]
pub struct TransportSink {
    epoch: u64,
    tx: mpsc::UnboundedSender<ChannelSignal>,
}

impl TransportSink {
    pub(crate) fn new(epoch: u64, tx: mpsc::UnboundedSender<ChannelSignal>) -> Self {
        Self { epoch, tx }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn connected(&self, payload: Value) {
        self.emit(TransportEvent::Connected(payload));
    }

    pub fn message(&self, kind: &str, payload: Value) {
        self.emit(TransportEvent::Message {
            kind: kind.to_string(),
            payload,
        });
    }

    pub fn disconnected(&self, reason: &str) {
        self.emit(TransportEvent::Disconnected(reason.to_string()));
    }

    fn emit(&self, event: TransportEvent) {
        let signal = ChannelSignal::Transport {
            epoch: self.epoch,
            event,
        };
        if self.tx.send(signal).is_err() {
            tracing::debug!("Channel for epoch {} is gone, dropping notification", self.epoch);
        }
    }
}

/// Bidirectional message-framed connection to the venue.
///
/// `connect` must return without waiting for the handshake; the outcome is
/// reported later through the sink. Connect failures are reported as
/// `disconnected`, the same as a drop after connecting.
pub trait Transport: Send {
    fn connect(&mut self, request: ConnectRequest, sink: TransportSink);
    fn disconnect(&mut self);
}

type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

struct Session {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

/// Socket.IO-over-WebSocket transport
pub struct WsTransport {
    connect_timeout: Duration,
    engine_io_version: u8,
    session: Option<Session>,
}

impl WsTransport {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            engine_io_version: config.engine_io_version,
            session: None,
        }
    }

    fn teardown(&mut self) {
        // The session task closes the socket itself and reports through its
        // own (now stale) sink.
        if let Some(mut session) = self.session.take() {
            if let Some(tx) = session.shutdown.take() {
                let _ = tx.send(());
            }
        }
    }
}

impl Transport for WsTransport {
    fn connect(&mut self, request: ConnectRequest, sink: TransportSink) {
        self.teardown();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_session(
            request,
            sink,
            shutdown_rx,
            self.connect_timeout,
            self.engine_io_version,
        ));

        self.session = Some(Session {
            shutdown: Some(shutdown_tx),
            task,
        });
    }

    fn disconnect(&mut self) {
        self.teardown();
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.task.abort();
        }
    }
}

/// Build the handshake URL: `ws(s)://host/<path>/?EIO=<v>&transport=websocket&token=..&userID=..&apiType=..`
pub fn socket_url(request: &ConnectRequest, engine_io_version: u8) -> Result<Url, SdkError> {
    let mut url = Url::parse(&request.endpoint)
        .map_err(|e| SdkError::misuse(format!("Invalid URL: {}", e)))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(SdkError::misuse(format!("Unsupported URL scheme: {}", other))),
    };
    url.set_scheme(scheme)
        .map_err(|_| SdkError::misuse(format!("Cannot switch {} to {}", request.endpoint, scheme)))?;

    let base = url.path().trim_end_matches('/').to_string();
    let path = request.path.trim_end_matches('/');
    url.set_path(&format!("{}{}/", base, path));

    {
        let mut query = url.query_pairs_mut();
        query.clear();
        query.append_pair("EIO", &engine_io_version.to_string());
        query.append_pair("transport", "websocket");
        for (key, value) in request.query_pairs() {
            query.append_pair(key, value);
        }
    }

    Ok(url)
}

async fn run_session(
    request: ConnectRequest,
    sink: TransportSink,
    mut shutdown: oneshot::Receiver<()>,
    connect_timeout: Duration,
    engine_io_version: u8,
) {
    let reason = match drive_socket(&request, &sink, &mut shutdown, connect_timeout, engine_io_version).await {
        Ok(reason) => reason,
        Err(e) => {
            tracing::warn!("Socket session ended with error: {}", e);
            e.message
        }
    };

    tracing::info!("Socket session for epoch {} closed: {}", sink.epoch(), reason);
    sink.disconnected(&reason);
}

async fn drive_socket(
    request: &ConnectRequest,
    sink: &TransportSink,
    shutdown: &mut oneshot::Receiver<()>,
    connect_timeout: Duration,
    engine_io_version: u8,
) -> Result<String, SdkError> {
    let url = socket_url(request, engine_io_version)?;
    tracing::info!(
        "Connecting socket to {}{} as user {}",
        request.endpoint,
        request.path,
        request.user_id
    );

    let ws_stream = tokio::select! {
        _ = &mut *shutdown => return Ok("io client disconnect".to_string()),
        result = tokio::time::timeout(connect_timeout, connect_async(url)) => match result {
            Ok(Ok((ws_stream, _))) => ws_stream,
            Ok(Err(e)) => return Err(SdkError::transport(format!("Connection failed: {}", e))),
            Err(_) => return Err(SdkError::transport("Connection timeout")),
        }
    };

    let (mut write, mut read) = ws_stream.split();
    let mut heartbeat: Option<Interval> = None;
    let mut liveness = Liveness::default();

    loop {
        let deadline = liveness.deadline();
        tokio::select! {
            _ = &mut *shutdown => {
                let _ = write.send(Message::Text(parser::encode_socket_disconnect())).await;
                let _ = write.close().await;
                return Ok("io client disconnect".to_string());
            }
            _ = next_heartbeat(&mut heartbeat) => {
                write.send(Message::Text(parser::encode_ping()))
                    .await
                    .map_err(|e| SdkError::transport(format!("Heartbeat failed: {}", e)))?;
            }
            _ = wait_until(deadline) => {
                tracing::warn!("No frame from server within {:?}, dropping socket", liveness.window);
                return Ok("ping timeout".to_string());
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!("Received frame: {}", text);
                    liveness.update();
                    match parser::decode_frame(&text) {
                        Ok(packet) => {
                            let mut timers = Timers { heartbeat: &mut heartbeat, liveness: &mut liveness };
                            if let Some(reason) = handle_packet(packet, sink, &mut write, &mut timers, engine_io_version).await? {
                                return Ok(reason);
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Dropping undecodable frame: {}", e);
                            sink.message("error", e.to_event_payload());
                        }
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    liveness.update();
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) => return Ok("transport close".to_string()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(SdkError::transport(format!("transport error: {}", e))),
                None => return Ok("transport close".to_string()),
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

async fn next_heartbeat(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Server liveness. The handshake sets the window; every inbound frame
/// (pongs under EIO 3, server pings under EIO 4, and any event) pushes the
/// deadline back. Unarmed until the handshake arrives.
#[derive(Debug, Default)]
struct Liveness {
    window: Option<Duration>,
    last_seen: Option<Instant>,
}

impl Liveness {
    fn arm(&mut self, handshake: &Handshake) {
        let window = handshake.ping_interval.saturating_add(handshake.ping_timeout);
        if window > 0 {
            self.window = Some(Duration::from_millis(window));
            self.last_seen = Some(Instant::now());
        }
    }

    fn update(&mut self) {
        if self.window.is_some() {
            self.last_seen = Some(Instant::now());
        }
    }

    fn deadline(&self) -> Option<Instant> {
        Some(self.last_seen? + self.window?)
    }
}

struct Timers<'a> {
    heartbeat: &'a mut Option<Interval>,
    liveness: &'a mut Liveness,
}

/// Returns `Some(reason)` when the packet ends the session
async fn handle_packet(
    packet: EnginePacket,
    sink: &TransportSink,
    write: &mut WsWriter,
    timers: &mut Timers<'_>,
    engine_io_version: u8,
) -> Result<Option<String>, SdkError> {
    match packet {
        EnginePacket::Open(handshake) => {
            tracing::debug!(
                "Engine handshake sid={} ping={}ms timeout={}ms",
                handshake.sid,
                handshake.ping_interval,
                handshake.ping_timeout
            );
            timers.liveness.arm(&handshake);
            if engine_io_version >= 4 {
                write.send(Message::Text(parser::encode_socket_connect()))
                    .await
                    .map_err(|e| SdkError::transport(format!("Namespace connect failed: {}", e)))?;
            } else if handshake.ping_interval > 0 {
                let period = Duration::from_millis(handshake.ping_interval);
                *timers.heartbeat = Some(interval_at(Instant::now() + period, period));
            }
        }
        EnginePacket::Close => return Ok(Some("transport close".to_string())),
        EnginePacket::Ping(probe) => {
            write.send(Message::Text(parser::encode_pong(&probe)))
                .await
                .map_err(|e| SdkError::transport(format!("Pong failed: {}", e)))?;
        }
        EnginePacket::Message(SocketPacket::Connect(payload)) => sink.connected(payload),
        EnginePacket::Message(SocketPacket::Disconnect) => {
            return Ok(Some("io server disconnect".to_string()))
        }
        EnginePacket::Message(SocketPacket::Event { name, data }) => sink.message(&name, data),
        EnginePacket::Message(SocketPacket::ConnectError(data)) => {
            return Err(SdkError::transport(format!("Connect error: {}", data)))
        }
        EnginePacket::Message(SocketPacket::Ack(_))
        | EnginePacket::Pong(_)
        | EnginePacket::Upgrade
        | EnginePacket::Noop => {}
    }
    Ok(None)
}
