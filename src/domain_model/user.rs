use serde::{Deserialize, Serialize};
use std::fmt;

pub const GUEST_USERNAME: &str = "Guest";

#[derive(
    Debug, Clone, Copy, Default, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    /// Placeholder sender id for guests and for incoming messages without one.
    pub const GUEST: UserId = UserId(0);

    pub fn is_guest(&self) -> bool {
        *self == Self::GUEST
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(UserId)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(pub String);

impl Role {
    pub fn is_admin(&self) -> bool {
        self.0 == "admin"
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authenticated session as persisted by the login flow.
///
/// Only [`crate::application_port::SessionService`] writes sessions; every
/// other component receives one by value.
#[derive(Clone, Eq, PartialEq)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

impl Session {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id,
            username: self.username.clone(),
            is_authenticated: true,
        }
    }

    /// Admins may edit anything; everyone else only what they authored.
    pub fn can_modify(&self, author_id: UserId) -> bool {
        self.role.is_admin() || self.user_id == author_id
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("role", &self.role)
            .finish()
    }
}

/// Who the chat connection speaks for.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub is_authenticated: bool,
}

impl Identity {
    pub fn guest() -> Self {
        Self {
            user_id: UserId::GUEST,
            username: GUEST_USERNAME.to_owned(),
            is_authenticated: false,
        }
    }

    pub fn from_session(session: Option<&Session>) -> Self {
        session.map(Session::identity).unwrap_or_else(Self::guest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: &str) -> Session {
        Session {
            token: "t0ken".into(),
            user_id: UserId(5),
            username: "alice".into(),
            role: Role(role.into()),
        }
    }

    #[test]
    fn guest_identity_without_session() {
        let identity = Identity::from_session(None);
        assert_eq!(identity.user_id, UserId::GUEST);
        assert_eq!(identity.username, "Guest");
        assert!(!identity.is_authenticated);
    }

    #[test]
    fn owner_or_admin_can_modify() {
        assert!(session("user").can_modify(UserId(5)));
        assert!(!session("user").can_modify(UserId(6)));
        assert!(session("admin").can_modify(UserId(6)));
    }

    #[test]
    fn debug_hides_token() {
        let rendered = format!("{:?}", session("user"));
        assert!(!rendered.contains("t0ken"));
    }
}
