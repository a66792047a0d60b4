use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::models::LoginCredentials;
use super::state::{reduce, AuthAction, AuthState};
use super::tokens::TokenStore;
use super::transport::AuthTransport;
use crate::error::AuthError;

/// The single authoritative auth state plus the operations that drive it.
///
/// Transport and token storage are injected so either can be swapped for a
/// test double. Every dispatched action is published to subscribers.
pub struct AuthSession {
    transport: Arc<dyn AuthTransport>,
    tokens: TokenStore,
    state: watch::Sender<AuthState>,
}

impl AuthSession {
    pub fn new(transport: Arc<dyn AuthTransport>, tokens: TokenStore) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            transport,
            tokens,
            state,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    fn dispatch(&self, action: AuthAction) {
        debug!("Dispatching {}", action.name());
        self.state.send_modify(|state| *state = reduce(state, action));
    }

    /// Re-establishes the user behind a stored access token.
    ///
    /// The token is checked against the server. If it is rejected the stored
    /// tokens are dropped and the state ends up unauthenticated.
    pub async fn restore(&self) {
        let Some(token) = self.tokens.access_token() else {
            debug!("No stored access token, starting signed out");
            return;
        };

        match self.transport.current_user(&token).await {
            Ok(user) => {
                info!("Restored session for email: {}", user.email);
                self.dispatch(AuthAction::SetUser(Some(user)));
            }
            Err(e) => {
                warn!("Stored session is no longer valid: {}", e);
                self.transport.logout().await;
                self.dispatch(AuthAction::SetUser(None));
            }
        }
    }

    /// Signs in and reports the outcome as a boolean. Failures land in `state().error`.
    pub async fn login(&self, email: &str, password: &str, remember_me: bool) -> bool {
        self.dispatch(AuthAction::LoginStart);

        let credentials = LoginCredentials {
            email: email.to_string(),
            password: password.to_string(),
            remember_me,
        };

        let response = match self.transport.login(&credentials).await {
            Ok(response) => response,
            Err(e) => {
                self.dispatch(AuthAction::LoginFailure(AuthError::from_error(&e)));
                return false;
            }
        };

        if let Err(e) = self.tokens.save(&response.tokens(), remember_me) {
            error!("Failed to persist tokens for email: {}: {}", email, e);
            self.tokens.clear();
            self.dispatch(AuthAction::LoginFailure(AuthError::from_error(&e)));
            return false;
        }

        info!("Signed in as {}", response.user.email);
        self.dispatch(AuthAction::LoginSuccess(response.user));
        true
    }

    pub async fn logout(&self) {
        self.transport.logout().await;
        self.dispatch(AuthAction::Logout);
        info!("Signed out");
    }

    pub fn clear_error(&self) {
        self.dispatch(AuthAction::ClearError);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::{AuthResponse, AuthUser};
    use crate::auth::tokens::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
    use crate::auth::transport::MockAuthTransport;
    use crate::error::{StorageError, TransportError, NETWORK_ERROR_MESSAGE};
    use crate::storage::{KeyValueStore, MemoryStore};

    struct Harness {
        durable: Arc<MemoryStore>,
        session: Arc<MemoryStore>,
        tokens: TokenStore,
    }

    impl Harness {
        fn new() -> Self {
            let durable = Arc::new(MemoryStore::new());
            let session = Arc::new(MemoryStore::new());
            let tokens = TokenStore::new(durable.clone(), session.clone());
            Self {
                durable,
                session,
                tokens,
            }
        }

        fn session(&self, transport: MockAuthTransport) -> AuthSession {
            AuthSession::new(Arc::new(transport), self.tokens.clone())
        }
    }

    fn user() -> AuthUser {
        AuthUser {
            id: "1".into(),
            email: "user@example.com".into(),
            name: "Test User".into(),
            role: "user".into(),
        }
    }

    fn auth_response() -> AuthResponse {
        AuthResponse {
            access_token: "access-1".into(),
            refresh_token: "refresh-1".into(),
            user: user(),
        }
    }

    #[tokio::test]
    async fn test_login_remember_me_uses_durable_storage() {
        let harness = Harness::new();
        let mut transport = MockAuthTransport::new();
        transport
            .expect_login()
            .withf(|c| c.email == "user@example.com" && c.password == "pw" && c.remember_me)
            .times(1)
            .returning(|_| Ok(auth_response()));

        let session = harness.session(transport);
        assert!(session.login("user@example.com", "pw", true).await);

        assert_eq!(harness.durable.get(ACCESS_TOKEN_KEY).as_deref(), Some("access-1"));
        assert_eq!(harness.durable.get(REFRESH_TOKEN_KEY).as_deref(), Some("refresh-1"));
        assert!(harness.session.is_empty());

        let state = session.state();
        assert!(state.is_authenticated);
        assert!(!state.is_loading);
        assert_eq!(state.user, Some(user()));
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn test_login_without_remember_me_uses_session_storage() {
        let harness = Harness::new();
        let mut transport = MockAuthTransport::new();
        transport.expect_login().returning(|_| Ok(auth_response()));

        let session = harness.session(transport);
        assert!(session.login("user@example.com", "pw", false).await);

        assert_eq!(harness.session.get(ACCESS_TOKEN_KEY).as_deref(), Some("access-1"));
        assert_eq!(harness.session.get(REFRESH_TOKEN_KEY).as_deref(), Some("refresh-1"));
        assert!(harness.durable.is_empty());
    }

    #[tokio::test]
    async fn test_login_invalid_credentials() {
        let harness = Harness::new();
        let mut transport = MockAuthTransport::new();
        transport.expect_login().returning(|_| {
            Err(TransportError::Status {
                status: 401,
                message: "Invalid credentials".into(),
            })
        });

        let session = harness.session(transport);
        assert!(!session.login("user@example.com", "wrong", false).await);

        let state = session.state();
        assert!(!state.is_authenticated);
        assert!(!state.is_loading);
        let error = state.error.expect("error is set");
        assert_eq!(error.name, "AuthError");
        assert_eq!(error.message, "Invalid credentials");
        assert!(harness.durable.is_empty());
        assert!(harness.session.is_empty());
    }

    #[tokio::test]
    async fn test_login_network_failure() {
        let harness = Harness::new();
        let mut transport = MockAuthTransport::new();
        transport
            .expect_login()
            .returning(|_| Err(TransportError::Network("connection refused".into())));

        let session = harness.session(transport);
        assert!(!session.login("user@example.com", "pw", true).await);
        assert_eq!(session.state().error.map(|e| e.message), Some(NETWORK_ERROR_MESSAGE.to_string()));
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only")))
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_login_fails_when_tokens_cannot_be_saved() {
        let tokens = TokenStore::new(Arc::new(BrokenStore), Arc::new(MemoryStore::new()));
        let mut transport = MockAuthTransport::new();
        transport.expect_login().returning(|_| Ok(auth_response()));

        let session = AuthSession::new(Arc::new(transport), tokens);
        assert!(!session.login("user@example.com", "pw", true).await);

        let state = session.state();
        assert!(!state.is_authenticated);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn test_logout_always_signs_out() {
        let harness = Harness::new();
        let mut transport = MockAuthTransport::new();
        transport.expect_login().returning(|_| Ok(auth_response()));
        transport.expect_logout().times(1).returning(|| ());

        let session = harness.session(transport);
        assert!(session.login("user@example.com", "pw", false).await);
        session.logout().await;

        assert_eq!(session.state(), AuthState::default());
    }

    #[tokio::test]
    async fn test_clear_error() {
        let harness = Harness::new();
        let mut transport = MockAuthTransport::new();
        transport
            .expect_login()
            .returning(|_| Err(TransportError::Network("timeout".into())));

        let session = harness.session(transport);
        session.login("user@example.com", "pw", false).await;
        assert!(session.state().error.is_some());

        session.clear_error();
        assert_eq!(session.state().error, None);
    }

    #[tokio::test]
    async fn test_restore_without_token_does_nothing() {
        let harness = Harness::new();
        let mut transport = MockAuthTransport::new();
        transport.expect_current_user().never();
        transport.expect_logout().never();

        let session = harness.session(transport);
        session.restore().await;
        assert_eq!(session.state(), AuthState::default());
    }

    #[tokio::test]
    async fn test_restore_verified_token() {
        let harness = Harness::new();
        harness.durable.set(ACCESS_TOKEN_KEY, "stored-access").unwrap();

        let mut transport = MockAuthTransport::new();
        transport
            .expect_current_user()
            .withf(|token| token == "stored-access")
            .times(1)
            .returning(|_| Ok(user()));

        let session = harness.session(transport);
        session.restore().await;

        let state = session.state();
        assert!(state.is_authenticated);
        assert_eq!(state.user, Some(user()));
    }

    #[tokio::test]
    async fn test_restore_rejected_token_signs_out() {
        let harness = Harness::new();
        harness.session.set(ACCESS_TOKEN_KEY, "expired").unwrap();

        let mut transport = MockAuthTransport::new();
        transport.expect_current_user().returning(|_| {
            Err(TransportError::Status {
                status: 401,
                message: "Token expired".into(),
            })
        });
        let tokens = harness.tokens.clone();
        transport.expect_logout().times(1).returning(move || tokens.clear());

        let session = harness.session(transport);
        session.restore().await;

        assert!(!session.state().is_authenticated);
        assert!(harness.session.is_empty());
        assert!(harness.durable.is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let harness = Harness::new();
        let mut transport = MockAuthTransport::new();
        transport.expect_login().returning(|_| Ok(auth_response()));

        let session = harness.session(transport);
        let mut rx = session.subscribe();
        assert!(!rx.borrow().is_authenticated);

        assert!(session.login("user@example.com", "pw", false).await);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_authenticated);
    }
}
