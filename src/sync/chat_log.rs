use crate::domain_model::*;
use chrono::{DateTime, Utc};

/// Two messages with equal content closer than this are the same message.
pub const DEDUP_WINDOW_MS: i64 = 1000;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Incoming {
    /// The server's copy of our own last send; the local copy stays.
    Echo,
    /// Already in the log within the dedup window.
    Duplicate,
    Appended,
}

/// Ordered, deduplicated chat history plus the pending-outbound marker used
/// to recognise the echo of our own sends.
#[derive(Debug, Default, Clone)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
    pending: Option<MessageId>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn pending(&self) -> Option<&ChatMessage> {
        let id = self.pending.as_ref()?;
        self.messages.iter().rev().find(|m| &m.id == id)
    }

    /// Builds the optimistic copy of an outgoing message, appends it and
    /// makes it the pending-outbound candidate. Only the latest send is
    /// tracked.
    pub fn push_local(
        &mut self,
        identity: &Identity,
        content: &str,
        now: DateTime<Utc>,
    ) -> &ChatMessage {
        let message = ChatMessage {
            id: MessageId::local(now),
            user_id: identity.user_id,
            username: identity.username.clone(),
            content: content.to_owned(),
            timestamp: now,
            delivery: Delivery::Pending,
        };
        self.pending = Some(message.id.clone());
        self.messages.push(message);
        let last = self.messages.len() - 1;
        &self.messages[last]
    }

    pub fn mark(&mut self, id: &MessageId, delivery: Delivery) {
        if let Some(message) = self.messages.iter_mut().rev().find(|m| &m.id == id) {
            message.delivery = delivery;
        }
    }

    pub fn apply_incoming(&mut self, message: ChatMessage) -> Incoming {
        if let Some(pending) = self.pending() {
            if pending.content == message.content && pending.user_id == message.user_id {
                let id = pending.id.clone();
                self.pending = None;
                // a failed transmit that still got echoed did reach the server
                self.mark(&id, Delivery::Confirmed);
                return Incoming::Echo;
            }
        }

        let duplicate = self
            .messages
            .iter()
            .any(|m| m.content == message.content && m.millis_apart(&message) < DEDUP_WINDOW_MS);
        if duplicate {
            return Incoming::Duplicate;
        }

        self.messages.push(message);
        Incoming::Appended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn alice() -> Identity {
        Identity {
            user_id: UserId(5),
            username: "alice".into(),
            is_authenticated: true,
        }
    }

    fn remote(user_id: i64, content: &str, at: DateTime<Utc>) -> ChatMessage {
        ChatMessage {
            id: MessageId::local(at),
            user_id: UserId(user_id),
            username: format!("user{user_id}"),
            content: content.into(),
            timestamp: at,
            delivery: Delivery::Remote,
        }
    }

    #[test]
    fn echo_of_own_send_is_absorbed() {
        let mut log = ChatLog::new();
        log.push_local(&alice(), "hello", t0());

        let echo = remote(5, "hello", t0() + Duration::milliseconds(50));
        assert_eq!(log.apply_incoming(echo), Incoming::Echo);
        assert_eq!(log.len(), 1);
        assert_eq!(log.messages()[0].delivery, Delivery::Confirmed);
        assert!(log.pending().is_none());
    }

    #[test]
    fn echo_matches_even_outside_the_window() {
        let mut log = ChatLog::new();
        log.push_local(&alice(), "hello", t0());

        let late_echo = remote(5, "hello", t0() + Duration::seconds(30));
        assert_eq!(log.apply_incoming(late_echo), Incoming::Echo);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn same_content_from_someone_else_is_not_an_echo() {
        let mut log = ChatLog::new();
        log.push_local(&alice(), "hello", t0());

        let other = remote(7, "hello", t0() + Duration::seconds(5));
        assert_eq!(log.apply_incoming(other), Incoming::Appended);
        assert_eq!(log.len(), 2);
        assert!(log.pending().is_some());
    }

    #[test]
    fn window_dedup_boundary() {
        let mut log = ChatLog::new();
        assert_eq!(log.apply_incoming(remote(7, "hi", t0())), Incoming::Appended);

        let close = remote(8, "hi", t0() + Duration::milliseconds(999));
        assert_eq!(log.apply_incoming(close), Incoming::Duplicate);
        assert_eq!(log.len(), 1);

        let apart = remote(8, "hi", t0() + Duration::milliseconds(1001));
        assert_eq!(log.apply_incoming(apart), Incoming::Appended);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn window_is_symmetric() {
        let mut log = ChatLog::new();
        log.apply_incoming(remote(7, "hi", t0()));
        let earlier = remote(7, "hi", t0() - Duration::milliseconds(500));
        assert_eq!(log.apply_incoming(earlier), Incoming::Duplicate);
    }

    #[test]
    fn second_send_replaces_pending_marker() {
        let mut log = ChatLog::new();
        log.push_local(&alice(), "one", t0());
        log.push_local(&alice(), "two", t0() + Duration::seconds(2));

        // echo of the first send only falls to the window check
        let echo_one = remote(5, "one", t0() + Duration::milliseconds(40));
        assert_eq!(log.apply_incoming(echo_one), Incoming::Duplicate);

        let echo_two = remote(5, "two", t0() + Duration::milliseconds(2040));
        assert_eq!(log.apply_incoming(echo_two), Incoming::Echo);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn scenario_send_echo_then_foreign_push() {
        let mut log = ChatLog::new();
        log.push_local(&alice(), "hello", t0());
        log.apply_incoming(remote(5, "hello", t0() + Duration::milliseconds(50)));
        log.apply_incoming(remote(7, "hi", t0() + Duration::milliseconds(2000)));

        let messages = log.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[0].user_id, UserId(5));
        assert_eq!(messages[1].user_id, UserId(7));
    }
}
