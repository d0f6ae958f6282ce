use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::Arc;
use tracing::{info, warn};

/// Reads the session out of `store`.
///
/// A store holding only some of the session keys (or a non-numeric user id)
/// is treated as corrupt: it is cleared and reported as logged out.
pub async fn load_session(store: &dyn SessionStore) -> Result<Option<Session>, StoreError> {
    let mut values = Vec::with_capacity(SESSION_KEYS.len());
    for key in SESSION_KEYS {
        values.push(store.get(key).await?);
    }
    if values.iter().all(Option::is_none) {
        return Ok(None);
    }

    let session = match <[Option<String>; 4]>::try_from(values) {
        Ok([Some(token), Some(user_id), Some(username), Some(role)]) if !token.is_empty() => {
            user_id.parse::<UserId>().ok().map(|user_id| Session {
                token,
                user_id,
                username,
                role: Role(role),
            })
        }
        _ => None,
    };

    if session.is_none() {
        warn!("incomplete session data in store, clearing it");
        store.clear().await?;
    }
    Ok(session)
}

pub struct RealSessionService {
    store: Arc<dyn SessionStore>,
    gateway: Arc<dyn AuthGateway>,
}

impl RealSessionService {
    pub fn new(store: Arc<dyn SessionStore>, gateway: Arc<dyn AuthGateway>) -> Self {
        Self { store, gateway }
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        self.store.set(TOKEN_KEY, &session.token).await?;
        self.store
            .set(USER_ID_KEY, &session.user_id.to_string())
            .await?;
        self.store.set(USERNAME_KEY, &session.username).await?;
        self.store.set(ROLE_KEY, &session.role.0).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionService for RealSessionService {
    async fn current(&self) -> Result<Option<Session>, SessionError> {
        Ok(load_session(self.store.as_ref()).await?)
    }

    async fn login(&self, username: &str, password: &str) -> Result<Session, SessionError> {
        let reply = self.gateway.login(username, password).await?;

        if reply.token.is_empty() || reply.username.is_empty() || reply.role.is_empty() {
            return Err(SessionError::InvalidLoginData(
                "login reply is missing token, username or role".into(),
            ));
        }
        if reply.user_id.is_guest() {
            return Err(SessionError::InvalidLoginData(
                "login reply carries no user id".into(),
            ));
        }

        let session = Session {
            token: reply.token,
            user_id: reply.user_id,
            username: reply.username,
            role: Role(reply.role),
        };

        // a half-written session would read back as corrupt anyway
        if let Err(e) = self.save(&session).await {
            let _ = self.store.clear().await;
            return Err(e.into());
        }

        info!(user_id = %session.user_id, role = %session.role, "logged in");
        Ok(session)
    }

    async fn register(
        &self,
        username: &str,
        password: &str,
        role: &str,
    ) -> Result<(), SessionError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(SessionError::InvalidLoginData(
                "username and password are required".into(),
            ));
        }
        self.gateway.register(username, password, role).await?;
        info!(username, "registered");
        Ok(())
    }

    async fn logout(&self) -> Result<(), SessionError> {
        self.store.clear().await?;
        info!("logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_store::MemorySessionStore;

    struct StubAuth {
        reply: Result<LoginReply, RemoteError>,
    }

    #[async_trait::async_trait]
    impl AuthGateway for StubAuth {
        async fn login(&self, _: &str, _: &str) -> Result<LoginReply, RemoteError> {
            self.reply.clone()
        }

        async fn register(&self, _: &str, _: &str, _: &str) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    fn reply(user_id: i64) -> LoginReply {
        LoginReply {
            token: "jwt".into(),
            role: "user".into(),
            username: "alice".into(),
            user_id: UserId(user_id),
        }
    }

    #[tokio::test]
    async fn empty_store_means_logged_out() {
        let store = MemorySessionStore::new();
        assert_eq!(load_session(&store).await.unwrap(), None);
    }

    #[tokio::test]
    async fn partial_session_is_cleared() {
        let store = MemorySessionStore::new();
        store.set(TOKEN_KEY, "jwt").await.unwrap();
        store.set(USERNAME_KEY, "alice").await.unwrap();

        assert_eq!(load_session(&store).await.unwrap(), None);
        assert_eq!(store.get(TOKEN_KEY).await.unwrap(), None);
        assert_eq!(store.get(USERNAME_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn identity_without_token_is_cleared() {
        let store = MemorySessionStore::new();
        store.set(USER_ID_KEY, "5").await.unwrap();
        store.set(USERNAME_KEY, "alice").await.unwrap();
        store.set(ROLE_KEY, "admin").await.unwrap();

        assert_eq!(load_session(&store).await.unwrap(), None);
        for key in SESSION_KEYS {
            assert_eq!(store.get(key).await.unwrap(), None, "{key} left behind");
        }
    }

    #[tokio::test]
    async fn non_numeric_user_id_is_corrupt() {
        let store = MemorySessionStore::new();
        for (key, value) in [
            (TOKEN_KEY, "jwt"),
            (USER_ID_KEY, "abc"),
            (USERNAME_KEY, "alice"),
            (ROLE_KEY, "user"),
        ] {
            store.set(key, value).await.unwrap();
        }
        assert_eq!(load_session(&store).await.unwrap(), None);
        assert_eq!(store.get(TOKEN_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn login_persists_all_keys() {
        let store = Arc::new(MemorySessionStore::new());
        let service = RealSessionService::new(
            store.clone(),
            Arc::new(StubAuth { reply: Ok(reply(5)) }),
        );

        let session = service.login("alice", "pw").await.unwrap();
        assert_eq!(session.user_id, UserId(5));

        let loaded = service.current().await.unwrap().unwrap();
        assert_eq!(loaded, session);
        assert_eq!(store.get(USER_ID_KEY).await.unwrap().as_deref(), Some("5"));
    }

    #[tokio::test]
    async fn rejected_login_maps_to_invalid_credentials() {
        let service = RealSessionService::new(
            Arc::new(MemorySessionStore::new()),
            Arc::new(StubAuth {
                reply: Err(RemoteError::Unauthorized("bad password".into())),
            }),
        );
        assert!(matches!(
            service.login("alice", "nope").await,
            Err(SessionError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn login_without_user_id_is_refused() {
        let store = Arc::new(MemorySessionStore::new());
        let service =
            RealSessionService::new(store.clone(), Arc::new(StubAuth { reply: Ok(reply(0)) }));
        assert!(matches!(
            service.login("alice", "pw").await,
            Err(SessionError::InvalidLoginData(_))
        ));
        assert_eq!(store.get(TOKEN_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn logout_clears_store() {
        let store = Arc::new(MemorySessionStore::new());
        let service =
            RealSessionService::new(store.clone(), Arc::new(StubAuth { reply: Ok(reply(5)) }));
        service.login("alice", "pw").await.unwrap();
        service.logout().await.unwrap();
        assert_eq!(service.current().await.unwrap(), None);
    }
}
