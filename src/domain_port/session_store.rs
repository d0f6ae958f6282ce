pub const TOKEN_KEY: &str = "token";
pub const USER_ID_KEY: &str = "userID";
pub const USERNAME_KEY: &str = "username";
pub const ROLE_KEY: &str = "role";

/// Every key a complete session consists of.
pub const SESSION_KEYS: [&str; 4] = [TOKEN_KEY, USER_ID_KEY, USERNAME_KEY, ROLE_KEY];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(String),
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Flat string key-value storage for session data.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn clear(&self) -> Result<(), StoreError>;
}
