use crate::domain_model::*;
use crate::domain_port::*;

/// Outcome of a forum mutation in terms a user can act on.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ForumError {
    #[error("log in first")]
    NotAuthenticated,
    #[error("your session has expired, log in again")]
    Unauthorized,
    #[error("you are not allowed to {action}")]
    Forbidden { action: &'static str },
    #[error("{0}")]
    Invalid(&'static str),
    #[error("could not {action}: {source}")]
    Request {
        action: &'static str,
        source: RemoteError,
    },
}

impl ForumError {
    /// Maps a gateway failure; authorization failures are final and are
    /// reported as such instead of as a generic request error.
    pub fn from_remote(action: &'static str, error: RemoteError) -> Self {
        match error {
            RemoteError::Unauthorized(_) => ForumError::Unauthorized,
            RemoteError::Forbidden(_) => ForumError::Forbidden { action },
            source => ForumError::Request { action, source },
        }
    }
}

#[async_trait::async_trait]
pub trait ForumService: Send + Sync {
    async fn create_post(
        &self,
        session: Option<&Session>,
        draft: PostDraft,
    ) -> Result<Post, ForumError>;
    async fn update_post(
        &self,
        session: Option<&Session>,
        post_id: PostId,
        draft: PostDraft,
    ) -> Result<Post, ForumError>;
    async fn delete_post(&self, session: Option<&Session>, post_id: PostId)
    -> Result<(), ForumError>;
    async fn create_comment(
        &self,
        session: Option<&Session>,
        post_id: PostId,
        draft: CommentDraft,
    ) -> Result<Comment, ForumError>;
    async fn delete_comment(
        &self,
        session: Option<&Session>,
        comment_id: CommentId,
    ) -> Result<(), ForumError>;
}
