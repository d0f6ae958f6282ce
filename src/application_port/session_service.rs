use crate::domain_model::*;
use crate::domain_port::*;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("invalid login data: {0}")]
    InvalidLoginData(String),
    #[error("auth service error: {0}")]
    Remote(RemoteError),
    #[error("session store error: {0}")]
    Store(#[from] StoreError),
}

impl From<RemoteError> for SessionError {
    fn from(error: RemoteError) -> Self {
        match error {
            RemoteError::Unauthorized(_) => SessionError::InvalidCredentials,
            other => SessionError::Remote(other),
        }
    }
}

/// Sole writer of the session store. Readers get a [`Session`] value from
/// [`SessionService::current`] and never touch the store themselves.
#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    async fn current(&self) -> Result<Option<Session>, SessionError>;
    async fn login(&self, username: &str, password: &str) -> Result<Session, SessionError>;
    async fn register(&self, username: &str, password: &str, role: &str)
    -> Result<(), SessionError>;
    async fn logout(&self) -> Result<(), SessionError>;
}
