use std::sync::Arc;
use tracing::{debug, warn};

use super::models::TokenPair;
use crate::error::StorageError;
use crate::storage::KeyValueStore;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Access and refresh tokens split across a durable and a session scope.
///
/// Only one scope is written per login. Reads check the durable scope first.
#[derive(Clone)]
pub struct TokenStore {
    durable: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(durable: Arc<dyn KeyValueStore>, session: Arc<dyn KeyValueStore>) -> Self {
        Self { durable, session }
    }

    /// Writes the pair to one scope and drops any pair left in the other.
    pub fn save(&self, tokens: &TokenPair, durable: bool) -> Result<(), StorageError> {
        let other = self.scope(!durable);
        other.remove(ACCESS_TOKEN_KEY)?;
        other.remove(REFRESH_TOKEN_KEY)?;

        let scope = self.scope(durable);
        scope.set(ACCESS_TOKEN_KEY, &tokens.access_token)?;
        scope.set(REFRESH_TOKEN_KEY, &tokens.refresh_token)?;
        debug!("Saved tokens to {} storage", if durable { "durable" } else { "session" });
        Ok(())
    }

    pub fn access_token(&self) -> Option<String> {
        self.lookup(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.lookup(REFRESH_TOKEN_KEY)
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token().is_some()
    }

    /// Replaces the access token in the scope that already holds one.
    pub fn update_access_token(&self, access_token: &str) -> Result<(), StorageError> {
        let durable = self.durable.get(ACCESS_TOKEN_KEY).is_some();
        self.scope(durable).set(ACCESS_TOKEN_KEY, access_token)
    }

    pub fn clear(&self) {
        for scope in [&self.durable, &self.session] {
            for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
                if let Err(e) = scope.remove(key) {
                    warn!("Failed to remove {} from storage: {}", key, e);
                }
            }
        }
        debug!("Cleared tokens from all storage scopes");
    }

    fn scope(&self, durable: bool) -> &dyn KeyValueStore {
        if durable {
            self.durable.as_ref()
        } else {
            self.session.as_ref()
        }
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.durable.get(key).or_else(|| self.session.get(key))
    }
}
