//! In-process stand-ins for the chat socket and the list endpoints.

use crate::domain_model::*;
use crate::domain_port::*;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};

/// Server side of one mock chat connection.
pub struct MockLink {
    pub identity: Identity,
    /// Frames the client sent.
    pub from_client: mpsc::Receiver<ConnMessage>,
    /// Frames to deliver to the client.
    pub to_client: mpsc::Sender<ConnMessage>,
}

impl MockLink {
    pub async fn push_json(&self, value: serde_json::Value) {
        self.to_client
            .send(ConnMessage::Text(value.to_string()))
            .await
            .unwrap();
    }

    pub async fn next_sent(&mut self) -> ConnMessage {
        tokio::time::timeout(Duration::from_secs(30), self.from_client.recv())
            .await
            .expect("client sent nothing")
            .expect("client side dropped")
    }
}

pub struct MockConnector {
    connects: AtomicUsize,
    failures_left: AtomicUsize,
    links: mpsc::UnboundedSender<MockLink>,
}

impl MockConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MockLink>) {
        let (links, links_rx) = mpsc::unbounded_channel();
        let connector = Self {
            connects: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
            links,
        };
        (connector, links_rx)
    }

    pub fn failing_first(self, failures: usize) -> Self {
        self.failures_left.store(failures, Ordering::SeqCst);
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ChatConnector for MockConnector {
    async fn connect(&self, identity: &Identity) -> Result<ChatChannel, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::ConnectFailed("connection refused".into()));
        }

        let (client_tx, from_client) = mpsc::channel(64);
        let (to_client, client_rx) = mpsc::channel(64);
        let _ = self.links.send(MockLink {
            identity: identity.clone(),
            from_client,
            to_client,
        });
        Ok(ChatChannel {
            sender: Box::new(client_tx),
            receiver: Box::new(client_rx),
        })
    }
}

/// Page source whose answers are scripted per call. A call can be held
/// open until [`MockPages::release`] is called.
pub struct MockPages {
    scope: ListScope,
    answers: Mutex<VecDeque<Result<Page<String>, RemoteError>>>,
    queries: Mutex<Vec<PageQuery>>,
    hold: Mutex<bool>,
    gate: Notify,
    started: Notify,
}

impl MockPages {
    pub fn new(scope: ListScope) -> Self {
        Self {
            scope,
            answers: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
            hold: Mutex::new(false),
            gate: Notify::new(),
            started: Notify::new(),
        }
    }

    pub fn answer(&self, answer: Result<Page<String>, RemoteError>) {
        self.answers.lock().unwrap().push_back(answer);
    }

    pub fn hold_calls(&self, hold: bool) {
        *self.hold.lock().unwrap() = hold;
    }

    pub fn release(&self) {
        self.gate.notify_waiters();
    }

    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn queries(&self) -> Vec<PageQuery> {
        self.queries.lock().unwrap().clone()
    }
}

pub fn page(items: &[&str], total: u64) -> Page<String> {
    Page {
        items: items.iter().map(|s| s.to_string()).collect(),
        total,
    }
}

#[async_trait::async_trait]
impl PageFetcher<String> for MockPages {
    fn scope(&self) -> ListScope {
        self.scope
    }

    async fn fetch_page(&self, query: PageQuery) -> Result<Page<String>, RemoteError> {
        self.queries.lock().unwrap().push(query);
        let held = *self.hold.lock().unwrap();
        if held {
            let released = self.gate.notified();
            self.started.notify_one();
            released.await;
        }
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(page(&[], 0)))
    }
}
