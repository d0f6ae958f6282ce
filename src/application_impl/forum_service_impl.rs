use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct RealForumService {
    gateway: Arc<dyn ForumGateway>,
}

impl RealForumService {
    pub fn new(gateway: Arc<dyn ForumGateway>) -> Self {
        Self { gateway }
    }
}

fn require(session: Option<&Session>) -> Result<&Session, ForumError> {
    session.ok_or(ForumError::NotAuthenticated)
}

fn check_post(draft: &PostDraft) -> Result<(), ForumError> {
    if draft.title.trim().is_empty() {
        return Err(ForumError::Invalid("a post needs a title"));
    }
    if draft.content.trim().is_empty() {
        return Err(ForumError::Invalid("a post needs some content"));
    }
    Ok(())
}

fn report(action: &'static str, error: RemoteError) -> ForumError {
    let error = ForumError::from_remote(action, error);
    warn!("failed to {action}: {error}");
    error
}

#[async_trait::async_trait]
impl ForumService for RealForumService {
    async fn create_post(
        &self,
        session: Option<&Session>,
        draft: PostDraft,
    ) -> Result<Post, ForumError> {
        let session = require(session)?;
        check_post(&draft)?;
        let post = self
            .gateway
            .create_post(&session.token, &draft)
            .await
            .map_err(|e| report("create the post", e))?;
        debug!(post_id = %post.id, "post created");
        Ok(post)
    }

    async fn update_post(
        &self,
        session: Option<&Session>,
        post_id: PostId,
        draft: PostDraft,
    ) -> Result<Post, ForumError> {
        let session = require(session)?;
        check_post(&draft)?;
        self.gateway
            .update_post(&session.token, post_id, &draft)
            .await
            .map_err(|e| report("edit this post", e))
    }

    async fn delete_post(
        &self,
        session: Option<&Session>,
        post_id: PostId,
    ) -> Result<(), ForumError> {
        let session = require(session)?;
        self.gateway
            .delete_post(&session.token, post_id)
            .await
            .map_err(|e| report("delete this post", e))?;
        debug!(%post_id, "post deleted");
        Ok(())
    }

    async fn create_comment(
        &self,
        session: Option<&Session>,
        post_id: PostId,
        draft: CommentDraft,
    ) -> Result<Comment, ForumError> {
        let session = require(session)?;
        if draft.content.trim().is_empty() {
            return Err(ForumError::Invalid("a comment cannot be empty"));
        }
        self.gateway
            .create_comment(&session.token, post_id, &draft)
            .await
            .map_err(|e| report("post the comment", e))
    }

    async fn delete_comment(
        &self,
        session: Option<&Session>,
        comment_id: CommentId,
    ) -> Result<(), ForumError> {
        let session = require(session)?;
        self.gateway
            .delete_comment(&session.token, comment_id)
            .await
            .map_err(|e| report("delete this comment", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingGateway {
        calls: Mutex<Vec<String>>,
        fail_with: Option<RemoteError>,
    }

    impl RecordingGateway {
        fn record(&self, call: String) -> Result<(), RemoteError> {
            self.calls.lock().unwrap().push(call);
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    #[async_trait::async_trait]
    impl ForumGateway for RecordingGateway {
        async fn create_post(&self, token: &str, draft: &PostDraft) -> Result<Post, RemoteError> {
            self.record(format!("create_post {token}"))?;
            Ok(Post {
                id: PostId(1),
                author_id: UserId(5),
                title: draft.title.clone(),
                content: draft.content.clone(),
                username: String::new(),
            })
        }

        async fn update_post(
            &self,
            token: &str,
            post_id: PostId,
            draft: &PostDraft,
        ) -> Result<Post, RemoteError> {
            self.record(format!("update_post {token} {post_id}"))?;
            Ok(Post {
                id: post_id,
                author_id: UserId(5),
                title: draft.title.clone(),
                content: draft.content.clone(),
                username: String::new(),
            })
        }

        async fn delete_post(&self, token: &str, post_id: PostId) -> Result<(), RemoteError> {
            self.record(format!("delete_post {token} {post_id}"))
        }

        async fn create_comment(
            &self,
            token: &str,
            post_id: PostId,
            draft: &CommentDraft,
        ) -> Result<Comment, RemoteError> {
            self.record(format!("create_comment {token} {post_id}"))?;
            Ok(Comment {
                id: CommentId(9),
                author_id: UserId(5),
                post_id,
                content: draft.content.clone(),
                username: String::new(),
                created_at: None,
            })
        }

        async fn delete_comment(
            &self,
            token: &str,
            comment_id: CommentId,
        ) -> Result<(), RemoteError> {
            self.record(format!("delete_comment {token} {comment_id}"))
        }
    }

    fn session() -> Session {
        Session {
            token: "jwt".into(),
            user_id: UserId(5),
            username: "alice".into(),
            role: Role("user".into()),
        }
    }

    #[tokio::test]
    async fn mutations_need_a_session() {
        let gateway = Arc::new(RecordingGateway::default());
        let service = RealForumService::new(gateway.clone());

        let result = service.delete_post(None, PostId(3)).await;
        assert_eq!(result, Err(ForumError::NotAuthenticated));
        assert!(gateway.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn token_is_forwarded() {
        let gateway = Arc::new(RecordingGateway::default());
        let service = RealForumService::new(gateway.clone());
        let session = session();

        service
            .delete_comment(Some(&session), CommentId(4))
            .await
            .unwrap();
        assert_eq!(*gateway.calls.lock().unwrap(), vec!["delete_comment jwt 4"]);
    }

    #[tokio::test]
    async fn forbidden_is_reported_to_the_user() {
        let gateway = Arc::new(RecordingGateway {
            fail_with: Some(RemoteError::Forbidden("not yours".into())),
            ..Default::default()
        });
        let service = RealForumService::new(gateway);
        let session = session();

        let error = service
            .delete_post(Some(&session), PostId(3))
            .await
            .unwrap_err();
        assert_eq!(
            error,
            ForumError::Forbidden {
                action: "delete this post"
            }
        );
        assert_eq!(error.to_string(), "you are not allowed to delete this post");
    }

    #[tokio::test]
    async fn expired_token_is_unauthorized() {
        let gateway = Arc::new(RecordingGateway {
            fail_with: Some(RemoteError::Unauthorized("Invalid token".into())),
            ..Default::default()
        });
        let service = RealForumService::new(gateway);
        let session = session();

        let error = service
            .create_comment(
                Some(&session),
                PostId(1),
                CommentDraft {
                    content: "nice".into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(error, ForumError::Unauthorized);
    }

    #[tokio::test]
    async fn blank_drafts_never_reach_the_server() {
        let gateway = Arc::new(RecordingGateway::default());
        let service = RealForumService::new(gateway.clone());
        let session = session();

        let result = service
            .create_post(
                Some(&session),
                PostDraft {
                    title: "  ".into(),
                    content: "body".into(),
                },
            )
            .await;
        assert!(matches!(result, Err(ForumError::Invalid(_))));
        assert!(gateway.calls.lock().unwrap().is_empty());
    }
}
