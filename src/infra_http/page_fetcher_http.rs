use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_http::HttpClient;
use std::marker::PhantomData;

/// Reads pages of posts or of one post's comments from the forum service.
///
/// Both list endpoints take `page` and `limit` query parameters; their
/// response shapes differ and are reconciled by [`PageEnvelope`].
pub struct HttpPageFetcher<T> {
    http: HttpClient,
    scope: ListScope,
    _item: PhantomData<fn() -> T>,
}

pub type HttpPostPages = HttpPageFetcher<Post>;
pub type HttpCommentPages = HttpPageFetcher<Comment>;

impl HttpPageFetcher<Post> {
    pub fn posts(http: HttpClient) -> Self {
        Self {
            http,
            scope: ListScope::Posts,
            _item: PhantomData,
        }
    }
}

impl HttpPageFetcher<Comment> {
    pub fn comments(http: HttpClient, post_id: PostId) -> Self {
        Self {
            http,
            scope: ListScope::Comments(post_id),
            _item: PhantomData,
        }
    }
}

impl<T> HttpPageFetcher<T> {
    fn path(&self) -> String {
        match self.scope {
            ListScope::Posts => "/posts".to_owned(),
            ListScope::Comments(post_id) => format!("/posts/{post_id}/comments"),
        }
    }
}

#[async_trait::async_trait]
impl<T> PageFetcher<T> for HttpPageFetcher<T>
where
    T: serde::de::DeserializeOwned + Send + 'static,
{
    fn scope(&self) -> ListScope {
        self.scope
    }

    async fn fetch_page(&self, query: PageQuery) -> Result<Page<T>, RemoteError> {
        let request = self
            .http
            .get(&self.path())
            .query(&[("page", query.page.to_string()), ("limit", query.limit.to_string())]);
        let envelope: PageEnvelope<T> = self.http.json(request).await?;
        Ok(envelope.into())
    }
}
