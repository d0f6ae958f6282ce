use crate::domain_port::*;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::trace;

/// Error body every backend service answers with.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// A reqwest client bound to one service's base URL.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.client.put(self.url(path))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends the request and decodes a successful JSON body.
    pub async fn json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, RemoteError> {
        let response = self.send(request).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    /// Sends the request and ignores whatever a successful response carries.
    pub async fn execute(&self, request: RequestBuilder) -> Result<(), RemoteError> {
        self.send(request).await.map(|_| ())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let status = response.status();
        trace!(url = %response.url(), %status, "http response");
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(status_error(status, &text))
    }
}

/// Maps a non-success status to the error the caller sees. 401 and 403 are
/// kept apart from other failures since they are never worth retrying.
pub fn status_error(status: StatusCode, body: &str) -> RemoteError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_owned()
        });
    match status {
        StatusCode::UNAUTHORIZED => RemoteError::Unauthorized(message),
        StatusCode::FORBIDDEN => RemoteError::Forbidden(message),
        _ => RemoteError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_message_is_used() {
        let err = status_error(StatusCode::FORBIDDEN, r#"{"error":"not your post"}"#);
        assert_eq!(err, RemoteError::Forbidden("not your post".into()));
    }

    #[test]
    fn unauthorized_is_its_own_kind() {
        let err = status_error(StatusCode::UNAUTHORIZED, "");
        assert_eq!(err, RemoteError::Unauthorized("Unauthorized".into()));
    }

    #[test]
    fn other_statuses_keep_the_code() {
        let err = status_error(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert_eq!(
            err,
            RemoteError::Status {
                status: 502,
                message: "Bad Gateway".into(),
            }
        );
        assert!(err.is_transient());
    }
}
