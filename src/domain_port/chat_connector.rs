use crate::domain_model::*;
use tokio::sync::mpsc::{Receiver, Sender};

// region conn message

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ConnMessage {
    Text(String),
    Binary(Vec<u8>),
    Ping,
    Pong,
    Close(Option<CloseCode>),
}

// endregion

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    ConnectFailed(String),
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
    #[error("connection closed")]
    Closed,
}

// region chat sender

#[async_trait::async_trait]
pub trait ChatSender: Send + Sync {
    async fn send(&mut self, message: ConnMessage) -> Result<(), TransportError>;
    /// Sends a close frame with `code` and stops accepting messages.
    async fn close(&mut self, code: CloseCode) -> Result<(), TransportError>;
}

#[async_trait::async_trait]
impl ChatSender for Sender<ConnMessage> {
    async fn send(&mut self, message: ConnMessage) -> Result<(), TransportError> {
        Sender::<ConnMessage>::send(self, message)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self, code: CloseCode) -> Result<(), TransportError> {
        Sender::<ConnMessage>::send(self, ConnMessage::Close(Some(code)))
            .await
            .map_err(|_| TransportError::Closed)
    }
}

// endregion

// region chat receiver

#[async_trait::async_trait]
pub trait ChatReceiver: Send + Sync {
    /// `None` means the peer went away without a close frame.
    async fn next(&mut self) -> Option<Result<ConnMessage, TransportError>>;
}

#[async_trait::async_trait]
impl ChatReceiver for Receiver<ConnMessage> {
    async fn next(&mut self) -> Option<Result<ConnMessage, TransportError>> {
        Some(Ok(Receiver::<ConnMessage>::recv(&mut *self).await?))
    }
}

// endregion

/// Both halves of an established chat connection.
pub struct ChatChannel {
    pub sender: Box<dyn ChatSender>,
    pub receiver: Box<dyn ChatReceiver>,
}

/// Opens chat connections on behalf of an identity. The identity travels as
/// connect-time parameters, so changing it means opening a new connection.
#[async_trait::async_trait]
pub trait ChatConnector: Send + Sync {
    async fn connect(&self, identity: &Identity) -> Result<ChatChannel, TransportError>;
}
