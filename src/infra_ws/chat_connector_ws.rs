use crate::domain_model::*;
use crate::domain_port::*;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects to the forum chat hub over WebSocket.
pub struct WsChatConnector {
    endpoint: String,
}

impl WsChatConnector {
    pub fn new(endpoint: impl Into<String>) -> Self {
        WsChatConnector {
            endpoint: endpoint.into(),
        }
    }
}

/// The hub reads the caller's identity from the query string:
/// `userID`, `username` and `auth` (`true`/`false`).
pub fn chat_url(endpoint: &str, identity: &Identity) -> Result<Url, TransportError> {
    Url::parse_with_params(
        endpoint,
        &[
            ("userID", identity.user_id.to_string()),
            ("username", identity.username.clone()),
            ("auth", identity.is_authenticated.to_string()),
        ],
    )
    .map_err(|e| TransportError::ConnectFailed(format!("bad chat endpoint {endpoint}: {e}")))
}

#[async_trait::async_trait]
impl ChatConnector for WsChatConnector {
    async fn connect(&self, identity: &Identity) -> Result<ChatChannel, TransportError> {
        let url = chat_url(&self.endpoint, identity)?;
        debug!(%url, "opening chat socket");
        let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        let (sink, stream) = ws.split();
        Ok(ChatChannel {
            sender: Box::new(WsSender { sink }),
            receiver: Box::new(WsReceiver { stream }),
        })
    }
}

struct WsSender {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait::async_trait]
impl ChatSender for WsSender {
    async fn send(&mut self, message: ConnMessage) -> Result<(), TransportError> {
        let frame = match message {
            ConnMessage::Text(text) => Message::Text(text.into()),
            ConnMessage::Binary(bytes) => Message::Binary(bytes.into()),
            ConnMessage::Ping => Message::Ping(Default::default()),
            ConnMessage::Pong => Message::Pong(Default::default()),
            ConnMessage::Close(code) => Message::Close(code.map(close_frame)),
        };
        self.sink
            .send(frame)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn close(&mut self, code: CloseCode) -> Result<(), TransportError> {
        self.sink
            .send(Message::Close(Some(close_frame(code))))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        let _ = self.sink.close().await;
        Ok(())
    }
}

fn close_frame(code: CloseCode) -> CloseFrame {
    CloseFrame {
        code: code.0.into(),
        reason: Default::default(),
    }
}

struct WsReceiver {
    stream: SplitStream<WsStream>,
}

#[async_trait::async_trait]
impl ChatReceiver for WsReceiver {
    async fn next(&mut self) -> Option<Result<ConnMessage, TransportError>> {
        use tokio_tungstenite::tungstenite::Error;

        loop {
            let frame = match self.stream.next().await? {
                Ok(frame) => frame,
                Err(Error::ConnectionClosed | Error::AlreadyClosed) => return None,
                Err(e) => return Some(Err(TransportError::ReceiveFailed(e.to_string()))),
            };
            let message = match frame {
                Message::Text(text) => ConnMessage::Text(text.to_string()),
                Message::Binary(bytes) => ConnMessage::Binary(bytes.to_vec()),
                Message::Ping(_) => ConnMessage::Ping,
                Message::Pong(_) => ConnMessage::Pong,
                Message::Close(frame) => {
                    ConnMessage::Close(frame.map(|f| CloseCode(u16::from(f.code))))
                }
                Message::Frame(_) => continue,
            };
            return Some(Ok(message));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_goes_into_the_query() {
        let identity = Identity {
            user_id: UserId(12),
            username: "ann lee&co".into(),
            is_authenticated: true,
        };
        let url = chat_url("ws://localhost:8081/ws", &identity).unwrap();
        assert_eq!(
            url.as_str(),
            "ws://localhost:8081/ws?userID=12&username=ann+lee%26co&auth=true"
        );
    }

    #[test]
    fn guest_identity() {
        let url = chat_url("ws://localhost:8081/ws", &Identity::guest()).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("userID".to_owned(), "0".to_owned()),
                ("username".to_owned(), "Guest".to_owned()),
                ("auth".to_owned(), "false".to_owned()),
            ]
        );
    }

    #[test]
    fn bad_endpoint_is_a_connect_failure() {
        let err = chat_url("not a url", &Identity::guest()).unwrap_err();
        assert!(matches!(err, TransportError::ConnectFailed(_)));
    }
}
