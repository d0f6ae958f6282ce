use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_http::HttpClient;

pub struct HttpForumGateway {
    http: HttpClient,
}

impl HttpForumGateway {
    pub fn new(http: HttpClient) -> Self {
        HttpForumGateway { http }
    }
}

#[async_trait::async_trait]
impl ForumGateway for HttpForumGateway {
    async fn create_post(&self, token: &str, draft: &PostDraft) -> Result<Post, RemoteError> {
        let request = self.http.post("/posts").bearer_auth(token).json(draft);
        self.http.json(request).await
    }

    async fn update_post(
        &self,
        token: &str,
        post_id: PostId,
        draft: &PostDraft,
    ) -> Result<Post, RemoteError> {
        let request = self
            .http
            .put(&format!("/posts/{post_id}"))
            .bearer_auth(token)
            .json(draft);
        self.http.json(request).await
    }

    async fn delete_post(&self, token: &str, post_id: PostId) -> Result<(), RemoteError> {
        let request = self
            .http
            .delete(&format!("/posts/{post_id}"))
            .bearer_auth(token);
        self.http.execute(request).await
    }

    async fn create_comment(
        &self,
        token: &str,
        post_id: PostId,
        draft: &CommentDraft,
    ) -> Result<Comment, RemoteError> {
        let request = self
            .http
            .post(&format!("/posts/{post_id}/comments"))
            .bearer_auth(token)
            .json(draft);
        self.http.json(request).await
    }

    async fn delete_comment(&self, token: &str, comment_id: CommentId) -> Result<(), RemoteError> {
        let request = self
            .http
            .delete(&format!("/comments/{comment_id}"))
            .bearer_auth(token);
        self.http.execute(request).await
    }
}
