//! Reconnecting event channel for the interactive (order) socket

use crate::{
    connection::{ChannelSignal, Transport, TransportEvent, TransportSink, WsTransport},
    credentials::{Credentials, CredentialsHolder},
    data::*,
    error::{ErrorReporter, SdkError},
    events::{SubscriptionId, SubscriptionRegistry},
    parser::decode_event_payload,
    retry::RetryTimer,
};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

type Outbox = Vec<(EventKind, Value)>;

/// Long-lived push session to the venue.
///
/// The channel owns one transport and replaces its socket on every
/// (re)connect. Subscriptions live in a [`SubscriptionRegistry`] that is
/// never cleared, so handlers registered at any time keep receiving events
/// across reconnects. After an unexpected drop the channel reconnects on a
/// fixed interval, forever, until [`close`](Self::close) is called.
///
/// Must be created inside a tokio runtime.
pub struct EventChannel {
    core: Arc<ChannelCore>,
    dispatcher: JoinHandle<()>,
}

struct ChannelCore {
    config: ClientConfig,
    registry: SubscriptionRegistry,
    credentials: CredentialsHolder,
    signal_tx: mpsc::UnboundedSender<ChannelSignal>,
    inner: Mutex<ChannelInner>,
}

struct ChannelInner {
    state: ConnectionState,
    /// Bumped for every socket the channel creates
    epoch: u64,
    socket_live: bool,
    closed_by_caller: bool,
    transport: Box<dyn Transport>,
    retry: RetryTimer,
}

impl EventChannel {
    /// Create a channel backed by the WebSocket transport
    pub fn new(config: ClientConfig) -> Result<Self, SdkError> {
        let transport = WsTransport::new(&config);
        Self::with_transport(config, transport)
    }

    /// Create a channel over a caller-supplied transport
    pub fn with_transport<T>(config: ClientConfig, transport: T) -> Result<Self, SdkError>
    where
        T: Transport + 'static,
    {
        Self::with_shared(
            config,
            transport,
            SubscriptionRegistry::new(),
            CredentialsHolder::new(),
        )
    }

    /// Create a channel that publishes into an existing registry and reads
    /// an existing credential holder
    pub fn with_shared<T>(
        config: ClientConfig,
        transport: T,
        registry: SubscriptionRegistry,
        credentials: CredentialsHolder,
    ) -> Result<Self, SdkError>
    where
        T: Transport + 'static,
    {
        config.validate()?;

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let retry = RetryTimer::new(config.retry_interval());

        let core = Arc::new(ChannelCore {
            config,
            registry,
            credentials,
            signal_tx,
            inner: Mutex::new(ChannelInner {
                state: ConnectionState::Disconnected,
                epoch: 0,
                socket_live: false,
                closed_by_caller: false,
                transport: Box::new(transport),
                retry,
            }),
        });

        let dispatcher = tokio::spawn(dispatch_loop(Arc::clone(&core), signal_rx));
        tracing::debug!("Event channel created for {}", core.config.url);

        Ok(Self { core, dispatcher })
    }

    /// Store the credential pair and start connecting.
    ///
    /// Returns as soon as the connect instruction is issued; completion is
    /// observed through `connect` / `disconnect` events. Opening an already
    /// open channel tears the current socket down first. Empty identity or
    /// token is refused: an `error` event is published, the state is left
    /// untouched and the misuse is returned.
    pub fn open(&self, identity: &str, token: &str) -> Result<(), SdkError> {
        let credentials = match Credentials::new(identity, token) {
            Ok(credentials) => credentials,
            Err(e) => {
                ErrorReporter::report_error(&e, "open");
                self.core.registry.publish(EventKind::Error, &e.to_event_payload());
                return Err(e);
            }
        };

        self.core.credentials.replace(credentials.clone());

        let mut inner = self.core.lock();
        inner.retry.cancel();
        self.core.start_epoch(&mut inner, &credentials);
        Ok(())
    }

    /// Caller-initiated teardown. Cancels any pending reconnect and
    /// disconnects the socket; nothing reconnects until the next `open`.
    pub fn close(&self) {
        let mut inner = self.core.lock();

        if inner.retry.cancel() {
            tracing::debug!("Cancelled pending reconnect");
        }
        inner.closed_by_caller = true;
        if inner.socket_live {
            inner.transport.disconnect();
            inner.socket_live = false;
        }
        inner.state = ConnectionState::Disconnected;

        tracing::info!("Event channel closed by caller");
    }

    pub fn state(&self) -> ConnectionState {
        self.core.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// True while a reconnect attempt is scheduled
    pub fn reconnect_pending(&self) -> bool {
        self.core.lock().retry.is_pending()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.core.config
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.core.registry
    }

    pub fn credentials(&self) -> &CredentialsHolder {
        &self.core.credentials
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.core.registry.subscribe(kind, handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.core.registry.unsubscribe(id)
    }

    pub fn on_connect<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Connect, handler)
    }

    pub fn on_joined<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Joined, handler)
    }

    pub fn on_error<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Error, handler)
    }

    pub fn on_disconnect<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Disconnect, handler)
    }

    /// Order updates, delivered as decoded JSON
    pub fn on_order<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Order, handler)
    }

    /// Trade updates, delivered as decoded JSON
    pub fn on_trade<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Trade, handler)
    }

    /// Position updates, delivered as decoded JSON
    pub fn on_position<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Position, handler)
    }

    pub fn on_logout<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Logout, handler)
    }
}

impl Drop for EventChannel {
    fn drop(&mut self) {
        self.dispatcher.abort();

        let mut inner = self.core.lock();
        inner.retry.cancel();
        inner.closed_by_caller = true;
        if inner.socket_live {
            inner.transport.disconnect();
            inner.socket_live = false;
        }
    }
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("url", &self.core.config.url)
            .field("state", &self.state())
            .field("registry", &self.core.registry)
            .finish()
    }
}

impl ChannelCore {
    fn lock(&self) -> MutexGuard<'_, ChannelInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the socket with a fresh one authenticated as `credentials`
    fn start_epoch(&self, inner: &mut ChannelInner, credentials: &Credentials) {
        if inner.socket_live {
            tracing::info!("Tearing down socket of epoch {} before reconnecting", inner.epoch);
            inner.transport.disconnect();
        }

        inner.epoch += 1;
        inner.socket_live = true;
        inner.closed_by_caller = false;
        inner.state = ConnectionState::Connecting;

        let request = ConnectRequest {
            endpoint: self.config.url.clone(),
            path: self.config.socket_path.clone(),
            token: credentials.token().to_string(),
            user_id: credentials.identity().to_string(),
            api_type: self.config.api_type.clone(),
        };
        let sink = TransportSink::new(inner.epoch, self.signal_tx.clone());

        tracing::info!(
            "Opening socket epoch {} for user {}",
            inner.epoch,
            credentials.identity()
        );
        inner.transport.connect(request, sink);
    }

    fn arm_retry(&self, inner: &mut ChannelInner) {
        let tx = self.signal_tx.clone();
        inner.retry.arm(move |generation| {
            let _ = tx.send(ChannelSignal::RetryDue { generation });
        });
        tracing::info!("Reconnecting in {:?}", inner.retry.interval());
    }

    fn handle_signal(&self, signal: ChannelSignal) -> Outbox {
        match signal {
            ChannelSignal::Transport { epoch, event } => self.handle_transport(epoch, event),
            ChannelSignal::RetryDue { generation } => self.handle_retry(generation),
        }
    }

    fn handle_transport(&self, epoch: u64, event: TransportEvent) -> Outbox {
        let mut inner = self.lock();
        let mut outbox = Outbox::new();

        if epoch != inner.epoch {
            tracing::debug!("Ignoring {:?} from stale epoch {} (current {})", event, epoch, inner.epoch);
            return outbox;
        }

        match event {
            TransportEvent::Connected(payload) => {
                if inner.closed_by_caller {
                    tracing::debug!("Socket connected after close, ignoring");
                    return outbox;
                }
                inner.state = ConnectionState::Connected;
                inner.retry.cancel();
                tracing::info!("Socket epoch {} connected", epoch);
                outbox.push((EventKind::Connect, payload));
            }
            TransportEvent::Message { kind, payload } => {
                if inner.closed_by_caller {
                    tracing::debug!("Dropping {} event received after close", kind);
                    return outbox;
                }
                match kind.parse::<EventKind>() {
                    Ok(kind) => match decode_event_payload(kind, payload) {
                        Ok(value) => outbox.push((kind, value)),
                        Err(e) => {
                            ErrorReporter::report_error(&e, "decode");
                            outbox.push((EventKind::Error, e.to_event_payload()));
                        }
                    },
                    Err(_) => tracing::debug!("Dropping event of unknown kind {}", kind),
                }
            }
            TransportEvent::Disconnected(reason) => {
                inner.state = ConnectionState::Disconnected;
                inner.socket_live = false;
                outbox.push((EventKind::Disconnect, Value::String(reason.clone())));

                if inner.closed_by_caller {
                    tracing::info!("Socket closed: {}", reason);
                } else {
                    tracing::warn!("Socket dropped unexpectedly: {}", reason);
                    self.arm_retry(&mut inner);
                }
            }
        }
        outbox
    }

    fn handle_retry(&self, generation: u64) -> Outbox {
        let mut inner = self.lock();
        let mut outbox = Outbox::new();

        if !inner.retry.claim(generation) {
            tracing::debug!("Ignoring superseded reconnect timer {}", generation);
            return outbox;
        }
        if inner.closed_by_caller || inner.state != ConnectionState::Disconnected {
            return outbox;
        }

        // One read of the holder so a concurrent rotation is seen whole.
        match self.credentials.get() {
            Some(credentials) => self.start_epoch(&mut inner, &credentials),
            None => {
                let e = SdkError::misuse("No credentials stored for reconnect");
                ErrorReporter::report_error(&e, "reconnect");
                outbox.push((EventKind::Error, e.to_event_payload()));
            }
        }
        outbox
    }
}

async fn dispatch_loop(core: Arc<ChannelCore>, mut signal_rx: mpsc::UnboundedReceiver<ChannelSignal>) {
    while let Some(signal) = signal_rx.recv().await {
        // Publish with the state lock released so handlers may call back
        // into the channel.
        for (kind, payload) in core.handle_signal(signal) {
            core.registry.publish(kind, &payload);
        }
    }
}

/// Builder pattern for client configuration
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn url(mut self, url: &str) -> Self {
        self.config.url = url.to_string();
        self
    }

    pub fn socket_path(mut self, path: &str) -> Self {
        self.config.socket_path = path.to_string();
        self
    }

    pub fn api_type(mut self, api_type: &str) -> Self {
        self.config.api_type = api_type.to_string();
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.config.retry_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn engine_io_version(mut self, version: u8) -> Self {
        self.config.engine_io_version = version;
        self
    }

    pub fn log_dir(mut self, dir: &str) -> Self {
        self.config.log_enabled = true;
        self.config.log_dir = dir.to_string();
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
