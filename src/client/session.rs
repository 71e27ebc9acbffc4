//! Hub session client.
//!
//! [`SessionClient`] is a thin handle over a background connection task. The
//! task owns the transport and multiplexes outbound calls, inbound records,
//! keepalive pings and shutdown with `tokio::select!`. When the link drops it
//! walks the reconnect schedule; registered handlers stay attached throughout.
//!
//! # Example
//!
//! ```rust,no_run
//! use math_game::{ClientConfig, SessionClient};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SessionClient::connect(ClientConfig::default()).await?;
//! client.on_new_question(|q| println!("{}", q.expression));
//! client.on_receive_result(|r| println!("correct: {}", r.is_correct));
//! client.submit_answer("Player", 4.0, 4.0, true).await?;
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ConnectionError, SubmitError};
use crate::protocol::hub::{handshake_request, parse_handshake_response};
use crate::protocol::{
    FrameDecoder, HubEvent, HubMessage, NewQuestion, ReceiveResult, SUBMIT_ANSWER, SubmitAnswer,
};

use super::transport::{Connector, Transport, WebSocketConnector};

/// Connection status as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    /// The link dropped; `attempt` counts from 1.
    Reconnecting { attempt: usize },
    Disconnected,
}

type NewQuestionHandler = Arc<dyn Fn(NewQuestion) + Send + Sync>;
type ReceiveResultHandler = Arc<dyn Fn(ReceiveResult) + Send + Sync>;
type InvocationReply = oneshot::Sender<Result<Option<Value>, SubmitError>>;

/// Event callbacks. At most one per event; they outlive any single link.
#[derive(Default)]
struct Handlers {
    new_question: Mutex<Option<NewQuestionHandler>>,
    receive_result: Mutex<Option<ReceiveResultHandler>>,
}

impl Handlers {
    fn emit(&self, event: HubEvent) {
        match event {
            HubEvent::NewQuestion(question) => {
                let handler = self
                    .new_question
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                match handler {
                    Some(handler) => handler(question),
                    None => debug!("no NewQuestion handler registered; dropping event"),
                }
            }
            HubEvent::ReceiveResult(result) => {
                let handler = self
                    .receive_result
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                match handler {
                    Some(handler) => handler(result),
                    None => debug!("no ReceiveResult handler registered; dropping event"),
                }
            }
        }
    }

    fn clear(&self) {
        *self.new_question.lock().unwrap_or_else(PoisonError::into_inner) = None;
        *self.receive_result.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Commands from the handle to the connection task.
enum Command {
    Invoke {
        target: &'static str,
        arguments: Vec<Value>,
        reply: InvocationReply,
    },
}

impl Command {
    fn reject(self, error: SubmitError) {
        match self {
            Self::Invoke { reply, .. } => {
                let _ = reply.send(Err(error));
            }
        }
    }
}

/// Background task bookkeeping, taken on teardown.
struct Lifecycle {
    task: JoinHandle<()>,
    shutdown_tx: oneshot::Sender<()>,
}

/// Handle to a live hub session.
pub struct SessionClient {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    state_rx: watch::Receiver<ConnectionState>,
    handlers: Arc<Handlers>,
    lifecycle: Mutex<Option<Lifecycle>>,
    invocation_timeout: Duration,
    shutdown_timeout: Duration,
    session_id: Uuid,
}

impl SessionClient {
    /// Connect to the hub named in `config` over a WebSocket.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] if the URL is unusable, the socket cannot
    /// be opened, or the hub does not complete the handshake.
    pub async fn connect(config: ClientConfig) -> Result<Self, ConnectionError> {
        let connector = WebSocketConnector::new(&config.hub_url)?;
        debug!(hub_url = %config.hub_url, endpoint = connector.url(), "resolved hub endpoint");
        Self::connect_with(connector, config).await
    }

    /// Connect through a custom [`Connector`].
    ///
    /// The connector is kept for reconnects.
    pub async fn connect_with<C: Connector>(
        connector: C,
        config: ClientConfig,
    ) -> Result<Self, ConnectionError> {
        let session_id = Uuid::new_v4();
        let span = info_span!("hub", session = %session_id);

        let link = open_link(&connector, config.handshake_timeout)
            .instrument(span.clone())
            .await?;
        span.in_scope(|| info!(url = %config.hub_url, "connected to hub"));

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connected);
        let state_tx = Arc::new(state_tx);
        let handlers = Arc::new(Handlers::default());

        let connection = Connection {
            connector,
            handlers: Arc::clone(&handlers),
            state: Arc::clone(&state_tx),
            cmd_rx,
            shutdown_rx,
            pending: HashMap::new(),
            next_invocation: 0,
            reconnect_delays: config.reconnect_delays.clone(),
            keepalive_interval: config.keepalive_interval,
            server_timeout: config.server_timeout,
            handshake_timeout: config.handshake_timeout,
        };
        let task = tokio::spawn(connection.run(link).instrument(span));

        Ok(Self {
            cmd_tx,
            state_tx,
            state_rx,
            handlers,
            lifecycle: Mutex::new(Some(Lifecycle { task, shutdown_tx })),
            invocation_timeout: config.invocation_timeout,
            shutdown_timeout: config.shutdown_timeout,
            session_id,
        })
    }

    /// Call `handler` for every `NewQuestion`, in arrival order.
    ///
    /// Replaces any handler registered earlier.
    pub fn on_new_question<F>(&self, handler: F)
    where
        F: Fn(NewQuestion) + Send + Sync + 'static,
    {
        let previous = self
            .handlers
            .new_question
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::new(handler));
        if previous.is_some() {
            warn!(session = %self.session_id, "replacing existing NewQuestion handler");
        }
    }

    /// Call `handler` for every `ReceiveResult`, in arrival order.
    ///
    /// Replaces any handler registered earlier.
    pub fn on_receive_result<F>(&self, handler: F)
    where
        F: Fn(ReceiveResult) + Send + Sync + 'static,
    {
        let previous = self
            .handlers
            .receive_result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::new(handler));
        if previous.is_some() {
            warn!(session = %self.session_id, "replacing existing ReceiveResult handler");
        }
    }

    /// Report an answer to the hub and wait for it to acknowledge.
    ///
    /// # Errors
    ///
    /// Fails with [`SubmitError::NotConnected`] straight away unless the
    /// client is connected; calls are never queued for a later link.
    pub async fn submit_answer(
        &self,
        player: &str,
        correct_answer: f64,
        user_answer: f64,
        is_correct: bool,
    ) -> Result<(), SubmitError> {
        if self.state() != ConnectionState::Connected {
            return Err(SubmitError::NotConnected);
        }

        let submission = SubmitAnswer {
            player: player.to_string(),
            correct_answer,
            user_answer,
            is_correct,
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Invoke {
                target: SUBMIT_ANSWER,
                arguments: submission.arguments(),
                reply: reply_tx,
            })
            .map_err(|_| SubmitError::NotConnected)?;

        match tokio::time::timeout(self.invocation_timeout, reply_rx).await {
            Ok(Ok(result)) => result.map(|_| ()),
            Ok(Err(_)) => Err(SubmitError::ConnectionLost),
            Err(_) => Err(SubmitError::Timeout),
        }
    }

    /// Current connection status.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// A receiver that observes every status change.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Id attached to this session's log lines.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Close the connection, stop reconnecting and drop both handlers.
    ///
    /// Safe to call more than once.
    pub async fn disconnect(&self) {
        let lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner).take();

        if let Some(Lifecycle { mut task, shutdown_tx }) = lifecycle {
            debug!(session = %self.session_id, "disconnect requested");
            let _ = shutdown_tx.send(());

            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "connection task ended abnormally"),
                Err(_) => {
                    warn!("connection task did not stop in time; aborting");
                    task.abort();
                }
            }
        }

        self.handlers.clear();
        self.state_tx.send_replace(ConnectionState::Disconnected);
    }
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("session_id", &self.session_id)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        let lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(lifecycle) = lifecycle {
            lifecycle.task.abort();
        }
    }
}

/// An open, handshaken transport.
struct Link<T> {
    transport: T,
    decoder: FrameDecoder,
    /// Records that arrived in the same chunk as the handshake reply.
    backlog: Vec<String>,
}

/// Why a link stopped being driven.
enum LinkOutcome {
    Shutdown,
    Lost(String),
    Closed(String),
}

async fn open_link<C: Connector>(
    connector: &C,
    handshake_timeout: Duration,
) -> Result<Link<C::Transport>, ConnectionError> {
    let mut transport = connector.connect().await?;
    transport
        .send(handshake_request())
        .await
        .map_err(|e| ConnectionError::Transport(e.to_string()))?;

    let mut decoder = FrameDecoder::default();
    let handshake = await_handshake(&mut transport, &mut decoder);
    let backlog = tokio::time::timeout(handshake_timeout, handshake)
        .await
        .map_err(|_| ConnectionError::HandshakeTimeout)??;

    Ok(Link {
        transport,
        decoder,
        backlog,
    })
}

async fn await_handshake<T: Transport>(
    transport: &mut T,
    decoder: &mut FrameDecoder,
) -> Result<Vec<String>, ConnectionError> {
    loop {
        match transport.recv().await {
            Some(Ok(text)) => {
                let mut records = decoder.push(&text).into_iter();
                if let Some(reply) = records.next() {
                    parse_handshake_response(&reply)?;
                    return Ok(records.collect());
                }
            }
            Some(Err(e)) => return Err(ConnectionError::Transport(e.to_string())),
            None => return Err(ConnectionError::Closed),
        }
    }
}

/// State owned by the background connection task.
struct Connection<C: Connector> {
    connector: C,
    handlers: Arc<Handlers>,
    state: Arc<watch::Sender<ConnectionState>>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    shutdown_rx: oneshot::Receiver<()>,
    pending: HashMap<String, InvocationReply>,
    next_invocation: u64,
    reconnect_delays: Vec<Duration>,
    keepalive_interval: Duration,
    server_timeout: Duration,
    handshake_timeout: Duration,
}

impl<C: Connector> Connection<C> {
    async fn run(mut self, mut link: Link<C::Transport>) {
        loop {
            let outcome = self.drive(&mut link).await;
            self.fail_pending();
            if link.decoder.pending() > 0 {
                debug!(bytes = link.decoder.pending(), "discarding partial record");
            }

            match outcome {
                LinkOutcome::Shutdown => {
                    if let Err(e) = link.transport.close().await {
                        debug!(error = %e, "error closing transport");
                    }
                    break;
                }
                LinkOutcome::Closed(reason) => {
                    info!(%reason, "hub ended the session");
                    break;
                }
                LinkOutcome::Lost(reason) => {
                    warn!(%reason, "connection to hub lost");
                    match self.reconnect().await {
                        Some(next) => link = next,
                        None => break,
                    }
                }
            }
        }

        self.state.send_replace(ConnectionState::Disconnected);
        debug!("connection task finished");
    }

    async fn drive(&mut self, link: &mut Link<C::Transport>) -> LinkOutcome {
        for record in std::mem::take(&mut link.backlog) {
            if let Some(outcome) = self.handle_record(&record) {
                return outcome;
            }
        }

        let period = self.keepalive_interval.max(Duration::from_millis(1));
        let mut keepalive = tokio::time::interval_at(Instant::now() + period, period);
        let silence = tokio::time::sleep(self.server_timeout);
        tokio::pin!(silence);

        loop {
            tokio::select! {
                _ = &mut self.shutdown_rx => return LinkOutcome::Shutdown,

                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => {
                        if let Err(reason) = self.dispatch(cmd, &mut link.transport).await {
                            return LinkOutcome::Lost(reason);
                        }
                    }
                    None => return LinkOutcome::Shutdown,
                },

                incoming = link.transport.recv() => match incoming {
                    Some(Ok(text)) => {
                        silence.as_mut().reset(Instant::now() + self.server_timeout);
                        for record in link.decoder.push(&text) {
                            if let Some(outcome) = self.handle_record(&record) {
                                return outcome;
                            }
                        }
                    }
                    Some(Err(e)) => return LinkOutcome::Lost(e.to_string()),
                    None => return LinkOutcome::Lost("hub closed the connection".to_string()),
                },

                _ = keepalive.tick() => {
                    if let Err(e) = send_message(&mut link.transport, &HubMessage::Ping).await {
                        return LinkOutcome::Lost(e);
                    }
                }

                () = &mut silence => {
                    let reason = "no message from hub within server timeout";
                    return LinkOutcome::Lost(reason.to_string());
                }
            }
        }
    }

    /// Returns an outcome if the record ends the link.
    fn handle_record(&mut self, record: &str) -> Option<LinkOutcome> {
        let message = match HubMessage::decode(record) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "dropping malformed hub message");
                return None;
            }
        };

        match message {
            HubMessage::Invocation { target, arguments, .. } => {
                match HubEvent::from_invocation(&target, arguments) {
                    Ok(Some(event)) => {
                        debug!(method = %target, "hub event");
                        self.handlers.emit(event);
                    }
                    Ok(None) => {
                        debug!(method = %target, "ignoring invocation of unknown client method")
                    }
                    Err(e) => warn!(method = %target, error = %e, "dropping malformed hub event"),
                }
                None
            }
            HubMessage::Completion {
                invocation_id,
                error,
                result,
            } => {
                match self.pending.remove(&invocation_id) {
                    Some(reply) => {
                        let outcome = match error {
                            Some(error) => Err(SubmitError::Hub(error)),
                            None => Ok(result),
                        };
                        let _ = reply.send(outcome);
                    }
                    None => debug!(%invocation_id, "completion for unknown invocation"),
                }
                None
            }
            HubMessage::Ping => None,
            HubMessage::Close { error, allow_reconnect } => {
                let reason = error.unwrap_or_else(|| "hub closed the session".to_string());
                Some(if allow_reconnect {
                    LinkOutcome::Lost(reason)
                } else {
                    LinkOutcome::Closed(reason)
                })
            }
            HubMessage::Other(kind) => {
                debug!(kind, "ignoring unsupported hub message");
                None
            }
        }
    }

    /// Send a command over the link. Errors mean the link is gone.
    async fn dispatch(&mut self, cmd: Command, transport: &mut C::Transport) -> Result<(), String> {
        match cmd {
            Command::Invoke {
                target,
                arguments,
                reply,
            } => {
                let invocation_id = self.next_invocation.to_string();
                self.next_invocation += 1;

                let message = HubMessage::Invocation {
                    invocation_id: Some(invocation_id.clone()),
                    target: target.to_string(),
                    arguments,
                };
                let text = match message.encode() {
                    Ok(text) => text,
                    Err(e) => {
                        let _ = reply.send(Err(SubmitError::Encode(e)));
                        return Ok(());
                    }
                };

                debug!(%invocation_id, method = target, "sending invocation");
                if let Err(e) = transport.send(text).await {
                    let _ = reply.send(Err(SubmitError::ConnectionLost));
                    return Err(e.to_string());
                }

                // Callers that timed out have dropped their receivers.
                self.pending.retain(|_, reply| !reply.is_closed());
                self.pending.insert(invocation_id, reply);
                Ok(())
            }
        }
    }

    fn fail_pending(&mut self) {
        for (_, reply) in self.pending.drain() {
            let _ = reply.send(Err(SubmitError::ConnectionLost));
        }
    }

    /// Walk the reconnect schedule. `None` means give up.
    async fn reconnect(&mut self) -> Option<Link<C::Transport>> {
        let delays = self.reconnect_delays.clone();

        for (i, delay) in delays.into_iter().enumerate() {
            let attempt = i + 1;
            self.state.send_replace(ConnectionState::Reconnecting { attempt });

            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut self.shutdown_rx => return None,
                    cmd = self.cmd_rx.recv() => match cmd {
                        Some(cmd) => cmd.reject(SubmitError::NotConnected),
                        None => return None,
                    },
                    () = &mut sleep => break,
                }
            }

            info!(attempt, "reconnecting to hub");
            let connect = open_link(&self.connector, self.handshake_timeout);
            tokio::pin!(connect);
            let result = loop {
                tokio::select! {
                    _ = &mut self.shutdown_rx => return None,
                    cmd = self.cmd_rx.recv() => match cmd {
                        Some(cmd) => cmd.reject(SubmitError::NotConnected),
                        None => return None,
                    },
                    result = &mut connect => break result,
                }
            };

            match result {
                Ok(link) => {
                    info!(attempt, "reconnected to hub");
                    self.state.send_replace(ConnectionState::Connected);
                    return Some(link);
                }
                Err(e) => warn!(attempt, error = %e, "reconnect attempt failed"),
            }
        }

        warn!("reconnect attempts exhausted");
        None
    }
}

async fn send_message<T: Transport>(transport: &mut T, message: &HubMessage) -> Result<(), String> {
    let text = message.encode().map_err(|e| e.to_string())?;
    transport.send(text).await.map_err(|e| e.to_string())
}
