use crate::domain_model::*;

/// Failure of a call to the forum or auth HTTP API.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum RemoteError {
    #[error("not authenticated: {0}")]
    Unauthorized(String),
    #[error("not allowed: {0}")]
    Forbidden(String),
    #[error("server responded {status}: {message}")]
    Status { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Whether asking again later can succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Network(_) => true,
            RemoteError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Reads one page of a collection.
#[async_trait::async_trait]
pub trait PageFetcher<T>: Send + Sync {
    fn scope(&self) -> ListScope;
    async fn fetch_page(&self, query: PageQuery) -> Result<Page<T>, RemoteError>;
}

#[async_trait::async_trait]
pub trait ForumGateway: Send + Sync {
    async fn create_post(&self, token: &str, draft: &PostDraft) -> Result<Post, RemoteError>;
    async fn update_post(
        &self,
        token: &str,
        post_id: PostId,
        draft: &PostDraft,
    ) -> Result<Post, RemoteError>;
    async fn delete_post(&self, token: &str, post_id: PostId) -> Result<(), RemoteError>;
    async fn create_comment(
        &self,
        token: &str,
        post_id: PostId,
        draft: &CommentDraft,
    ) -> Result<Comment, RemoteError>;
    async fn delete_comment(&self, token: &str, comment_id: CommentId) -> Result<(), RemoteError>;
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct LoginReply {
    pub token: String,
    pub role: String,
    pub username: String,
    #[serde(rename = "userID")]
    pub user_id: UserId,
}

#[async_trait::async_trait]
pub trait AuthGateway: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<LoginReply, RemoteError>;
    async fn register(&self, username: &str, password: &str, role: &str)
    -> Result<(), RemoteError>;
}
