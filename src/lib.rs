pub mod auth;
pub mod config;
pub mod error;
pub mod storage;

use std::sync::Arc;

pub use error::{AuthError, Error, StorageError, TransportError};
pub type Result<T> = std::result::Result<T, Error>;
pub use config::Settings;

pub use auth::{AuthSession, AuthState, AuthTransport, HttpAuthTransport, TokenStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore};

/// Everything a front end needs, wired from configuration.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub tokens: TokenStore,
    pub transport: Arc<HttpAuthTransport>,
    pub session: Arc<AuthSession>,
}

impl AppState {
    pub fn new(config: Settings) -> Result<Self> {
        let durable = FileStore::open(&config.storage.durable_path)?;
        let session = MemoryStore::new();
        Self::with_stores(config, Arc::new(durable), Arc::new(session))
    }

    pub fn with_stores(
        config: Settings,
        durable: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let base_url = config.api.base_url()?;
        let tokens = TokenStore::new(durable, session);
        let transport = Arc::new(HttpAuthTransport::new(base_url, tokens.clone()));
        let session = Arc::new(AuthSession::new(transport.clone(), tokens.clone()));

        Ok(Self {
            config: Arc::new(config),
            tokens,
            transport,
            session,
        })
    }
}
