use crate::domain_port::*;
use crate::infra_http::HttpClient;
use serde::Serialize;

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
}

pub struct HttpAuthGateway {
    http: HttpClient,
}

impl HttpAuthGateway {
    pub fn new(http: HttpClient) -> Self {
        HttpAuthGateway { http }
    }
}

#[async_trait::async_trait]
impl AuthGateway for HttpAuthGateway {
    async fn login(&self, username: &str, password: &str) -> Result<LoginReply, RemoteError> {
        let request = self.http.post("/login").json(&Credentials {
            username,
            password,
            role: None,
        });
        self.http.json(request).await
    }

    async fn register(
        &self,
        username: &str,
        password: &str,
        role: &str,
    ) -> Result<(), RemoteError> {
        let request = self.http.post("/register").json(&Credentials {
            username,
            password,
            role: Some(role),
        });
        self.http.execute(request).await
    }
}
