use crate::domain_model::*;
use crate::domain_port::*;
use crate::sync::chat_log::{ChatLog, Incoming};
use chrono::Utc;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

const COMMAND_CAP: usize = 64;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Fixed wait before each reconnect attempt. Not exponential.
    pub reconnect_delay: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_millis(3000),
        }
    }
}

/// Everything a chat view renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSnapshot {
    pub connection: ConnectionState,
    pub identity: Option<Identity>,
    pub messages: Vec<ChatMessage>,
    /// Reconnects scheduled since the last successful open.
    pub reconnect_attempts: u32,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IgnoreReason {
    EmptyMessage,
    NotConnected,
    NotAuthenticated,
}

/// Result of [`ChatSync::send`]. A send that fails its preconditions is
/// ignored, not an error.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SendOutcome {
    Sent(MessageId),
    /// Appended locally but the transport refused it; the entry stays in
    /// the log marked [`Delivery::Failed`].
    TransmitFailed(MessageId),
    Ignored(IgnoreReason),
}

enum ChatCommand {
    Connect {
        identity: Identity,
        done: oneshot::Sender<()>,
    },
    Send {
        text: String,
        reply: oneshot::Sender<SendOutcome>,
    },
    Disconnect {
        done: oneshot::Sender<()>,
    },
}

/// Handle to the chat actor.
///
/// All state lives in one task; commands, incoming frames, handshake
/// completion and the reconnect timer are handled strictly one after
/// another, so the dedup check-then-append needs no locking.
pub struct ChatSync {
    commands: Sender<ChatCommand>,
    snapshot: watch::Receiver<ChatSnapshot>,
    cancel: CancellationToken,
    actor_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ChatSync {
    pub fn spawn(connector: Arc<dyn ChatConnector>, config: ChatConfig) -> Self {
        let (commands_tx, commands_rx) = tokio::sync::mpsc::channel(COMMAND_CAP);
        let (snapshot_tx, snapshot_rx) = watch::channel(ChatSnapshot::default());
        let cancel = CancellationToken::new();

        let actor = ChatActor {
            connector,
            config,
            identity: None,
            state: ConnectionState::Closed,
            log: ChatLog::new(),
            outbound: None,
            inbound: None,
            handshake: None,
            reconnect_at: None,
            attempts: 0,
            snapshot_tx,
        };
        let actor_handle = tokio::spawn(actor.run(commands_rx, cancel.clone()));

        Self {
            commands: commands_tx,
            snapshot: snapshot_rx,
            cancel,
            actor_handle: Mutex::new(Some(actor_handle)),
        }
    }

    /// Starts (or restarts, if `identity` differs from the current one) the
    /// connection. Returns once the actor is `Connecting`, not once the
    /// handshake is done.
    pub async fn connect(&self, identity: Identity) {
        let (done, wait) = oneshot::channel();
        if self
            .commands
            .send(ChatCommand::Connect { identity, done })
            .await
            .is_ok()
        {
            let _ = wait.await;
        }
    }

    pub async fn send(&self, text: &str) -> SendOutcome {
        let (reply, outcome) = oneshot::channel();
        let command = ChatCommand::Send {
            text: text.to_owned(),
            reply,
        };
        if self.commands.send(command).await.is_err() {
            return SendOutcome::Ignored(IgnoreReason::NotConnected);
        }
        outcome
            .await
            .unwrap_or(SendOutcome::Ignored(IgnoreReason::NotConnected))
    }

    /// Closes the connection with a normal closure. No reconnect follows.
    pub async fn disconnect(&self) {
        let (done, wait) = oneshot::channel();
        if self
            .commands
            .send(ChatCommand::Disconnect { done })
            .await
            .is_ok()
        {
            let _ = wait.await;
        }
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.snapshot.clone()
    }

    /// Disconnects and waits for the actor to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.actor_handle.lock().ok().and_then(|mut h| h.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("chat actor ended abnormally: {e}");
            }
        }
    }
}

impl Drop for ChatSync {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

type Handshake = Pin<Box<dyn Future<Output = Result<ChatChannel, TransportError>> + Send>>;

struct ChatActor {
    connector: Arc<dyn ChatConnector>,
    config: ChatConfig,
    identity: Option<Identity>,
    state: ConnectionState,
    log: ChatLog,
    outbound: Option<Box<dyn ChatSender>>,
    inbound: Option<Box<dyn ChatReceiver>>,
    handshake: Option<Handshake>,
    reconnect_at: Option<Instant>,
    attempts: u32,
    snapshot_tx: watch::Sender<ChatSnapshot>,
}

impl ChatActor {
    async fn run(mut self, mut commands: Receiver<ChatCommand>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },

                result = handshake(&mut self.handshake) => {
                    self.handshake = None;
                    self.on_handshake(result);
                }

                frame = next_frame(&mut self.inbound) => self.on_frame(frame).await,

                _ = sleep_until(self.reconnect_at) => {
                    self.reconnect_at = None;
                    debug!(attempt = self.attempts, "reconnecting chat");
                    self.start_connect();
                }
            }
        }

        self.close_normally().await;
        debug!("chat actor stopped");
    }

    async fn handle_command(&mut self, command: ChatCommand) {
        match command {
            ChatCommand::Connect { identity, done } => {
                self.connect(identity).await;
                let _ = done.send(());
            }
            ChatCommand::Send { text, reply } => {
                let outcome = self.send(&text).await;
                let _ = reply.send(outcome);
            }
            ChatCommand::Disconnect { done } => {
                self.close_normally().await;
                let _ = done.send(());
            }
        }
    }

    async fn connect(&mut self, identity: Identity) {
        let live = self.state != ConnectionState::Closed;
        if live && self.identity.as_ref() == Some(&identity) {
            trace!("chat already bound to this identity");
            return;
        }
        if live {
            info!(user_id = %identity.user_id, "identity changed, reopening chat");
            self.close_normally().await;
        }
        self.identity = Some(identity);
        self.attempts = 0;
        self.start_connect();
    }

    fn start_connect(&mut self) {
        let Some(identity) = self.identity.clone() else {
            return;
        };
        let connector = self.connector.clone();
        self.handshake = Some(Box::pin(async move { connector.connect(&identity).await }));
        self.reconnect_at = None;
        self.state = ConnectionState::Connecting;
        self.publish();
    }

    fn on_handshake(&mut self, result: Result<ChatChannel, TransportError>) {
        match result {
            Ok(channel) => {
                self.outbound = Some(channel.sender);
                self.inbound = Some(channel.receiver);
                self.state = ConnectionState::Open;
                self.attempts = 0;
                info!("chat connected");
                self.publish();
            }
            Err(e) => {
                warn!("chat connect failed: {e}");
                self.schedule_reconnect();
            }
        }
    }

    /// Drops the current connection and arms a single reconnect.
    fn schedule_reconnect(&mut self) {
        self.outbound = None;
        self.inbound = None;
        self.handshake = None;
        self.state = ConnectionState::Connecting;
        self.attempts += 1;
        self.reconnect_at = Some(Instant::now() + self.config.reconnect_delay);
        self.publish();
    }

    async fn close_normally(&mut self) {
        if let Some(mut outbound) = self.outbound.take() {
            if let Err(e) = outbound.close(CloseCode::NORMAL).await {
                debug!("close frame not delivered: {e}");
            }
        }
        self.inbound = None;
        self.handshake = None;
        self.reconnect_at = None;
        if self.state != ConnectionState::Closed {
            self.state = ConnectionState::Closed;
            info!("chat disconnected");
            self.publish();
        }
    }

    async fn on_frame(&mut self, frame: Option<Result<ConnMessage, TransportError>>) {
        match frame {
            Some(Ok(ConnMessage::Text(text))) => self.on_incoming(&text),
            Some(Ok(ConnMessage::Binary(bytes))) => match String::from_utf8(bytes) {
                Ok(text) => self.on_incoming(&text),
                Err(_) => warn!("dropping non-UTF-8 chat frame"),
            },
            Some(Ok(ConnMessage::Ping)) | Some(Ok(ConnMessage::Pong)) => {}
            Some(Ok(ConnMessage::Close(code))) => {
                let code = code.unwrap_or(CloseCode::ABNORMAL);
                if code.is_normal() {
                    info!("chat closed by server");
                    self.outbound = None;
                    self.close_normally().await;
                } else {
                    warn!(%code, "chat closed abnormally");
                    self.schedule_reconnect();
                }
            }
            Some(Err(e)) => {
                warn!("chat connection error: {e}");
                self.schedule_reconnect();
            }
            None => {
                warn!("chat connection dropped");
                self.schedule_reconnect();
            }
        }
    }

    fn on_incoming(&mut self, raw: &str) {
        let incoming = match IncomingMessage::parse(raw) {
            Ok(incoming) => incoming,
            Err(e) => {
                warn!("dropping malformed chat payload: {e}");
                return;
            }
        };
        let message = incoming.into_message(Utc::now());
        if message.content.trim().is_empty() {
            warn!(id = %message.id, "dropping chat payload without content");
            return;
        }

        match self.log.apply_incoming(message) {
            Incoming::Appended | Incoming::Echo => self.publish(),
            Incoming::Duplicate => trace!("duplicate chat message dropped"),
        }
    }

    async fn send(&mut self, text: &str) -> SendOutcome {
        let content = text.trim();
        if content.is_empty() {
            return SendOutcome::Ignored(IgnoreReason::EmptyMessage);
        }
        let (Some(outbound), true) = (self.outbound.as_mut(), self.state.is_open()) else {
            return SendOutcome::Ignored(IgnoreReason::NotConnected);
        };
        let Some(identity) = self.identity.as_ref().filter(|i| i.is_authenticated) else {
            return SendOutcome::Ignored(IgnoreReason::NotAuthenticated);
        };

        let message = self.log.push_local(identity, content, Utc::now());
        let id = message.id.clone();
        let payload = serde_json::to_string(&OutgoingMessage::from(message));

        let result = match payload {
            Ok(payload) => outbound.send(ConnMessage::Text(payload)).await,
            Err(e) => Err(TransportError::SendFailed(e.to_string())),
        };

        let outcome = match result {
            Ok(()) => SendOutcome::Sent(id),
            Err(e) => {
                warn!(%id, "chat message not transmitted: {e}");
                self.log.mark(&id, Delivery::Failed);
                SendOutcome::TransmitFailed(id)
            }
        };
        self.publish();
        outcome
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(ChatSnapshot {
            connection: self.state,
            identity: self.identity.clone(),
            messages: self.log.messages().to_vec(),
            reconnect_attempts: self.attempts,
        });
    }
}

async fn handshake(pending: &mut Option<Handshake>) -> Result<ChatChannel, TransportError> {
    match pending {
        Some(handshake) => handshake.await,
        None => std::future::pending().await,
    }
}

async fn next_frame(
    inbound: &mut Option<Box<dyn ChatReceiver>>,
) -> Option<Result<ConnMessage, TransportError>> {
    match inbound {
        Some(inbound) => inbound.next().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
