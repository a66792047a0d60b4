use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::models::{
    AuthResponse, AuthUser, AvailabilityResponse, LoginCredentials, RefreshRequest, RefreshResponse,
    RegisterCredentials, RegisterResponse,
};
use super::tokens::TokenStore;
use crate::error::TransportError;

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";
const SESSION_CHECK_FAILED: &str = "Session verification failed";

/// Calls against the remote auth API.
///
/// Logout and the availability checks never fail from the caller's point of
/// view. Login, registration and refresh surface or invalidate on failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthTransport: Send + Sync {
    async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse, TransportError>;

    /// Best-effort server logout. Stored tokens are cleared whatever happens.
    async fn logout(&self);

    /// Exchanges the stored refresh token for a new access token.
    ///
    /// Returns `None` without a request when no refresh token is stored, and
    /// clears all tokens when the exchange fails.
    async fn refresh_token(&self) -> Option<String>;

    async fn register(&self, credentials: &RegisterCredentials) -> Result<RegisterResponse, TransportError>;

    async fn check_email_availability(&self, email: &str) -> bool;

    async fn check_username_availability(&self, username: &str) -> bool;

    /// Looks up the user owning `access_token`.
    async fn current_user(&self, access_token: &str) -> Result<AuthUser, TransportError>;
}

pub struct HttpAuthTransport {
    client: Client,
    base_url: String,
    tokens: TokenStore,
}

impl HttpAuthTransport {
    pub fn new(base_url: impl Into<String>, tokens: TokenStore) -> Self {
        Self::with_client(Client::new(), base_url, tokens)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, tokens: TokenStore) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check_availability(&self, path: &str, body: Value) -> Result<bool, TransportError> {
        let res = self.client.post(self.url(path)).json(&body).send().await?;

        if !res.status().is_success() {
            return Err(TransportError::Status {
                status: res.status().as_u16(),
                message: "Unable to check availability".to_string(),
            });
        }

        let data: AvailabilityResponse = res.json().await?;
        Ok(data.is_available)
    }

    async fn try_refresh(&self, refresh_token: &str) -> Result<String, TransportError> {
        let res = self
            .client
            .post(self.url("/auth/refresh"))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(TransportError::Status {
                status: res.status().as_u16(),
                message: "Token refresh rejected".to_string(),
            });
        }

        let data: RefreshResponse = res.json().await?;
        Ok(data.access_token)
    }
}

#[async_trait]
impl AuthTransport for HttpAuthTransport {
    async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse, TransportError> {
        info!("Sending login request for email: {}", credentials.email);

        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(credentials)
            .send()
            .await
            .map_err(|e| {
                error!("Login request failed for email: {}: {}", credentials.email, e);
                TransportError::from(e)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            // An error body that is not JSON counts as a network failure
            let body: Value = res.json().await.map_err(|e| {
                error!("Unreadable login error body for email: {} ({}): {}", credentials.email, status, e);
                TransportError::from(e)
            })?;
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| LOGIN_FAILED.to_string(), str::to_string);
            error!("Login rejected for email: {} ({}): {}", credentials.email, status, message);
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let data: AuthResponse = res.json().await?;
        info!("Login successful for email: {}", credentials.email);
        Ok(data)
    }

    async fn logout(&self) {
        if let Some(token) = self.tokens.access_token() {
            let result = self
                .client
                .post(self.url("/auth/logout"))
                .bearer_auth(token)
                .header(CONTENT_TYPE, "application/json")
                .send()
                .await;

            match result {
                Ok(res) if res.status().is_success() => info!("Logged out on server"),
                Ok(res) => warn!("Logout API call returned {}", res.status()),
                Err(e) => warn!("Logout API call failed: {}", e),
            }
        } else {
            debug!("No access token stored, skipping logout call");
        }

        self.tokens.clear();
    }

    async fn refresh_token(&self) -> Option<String> {
        let refresh_token = self.tokens.refresh_token()?;

        match self.try_refresh(&refresh_token).await {
            Ok(access_token) => {
                if let Err(e) = self.tokens.update_access_token(&access_token) {
                    warn!("Failed to store refreshed access token, clearing stored tokens: {}", e);
                    self.tokens.clear();
                    return None;
                }
                info!("Access token refreshed");
                Some(access_token)
            }
            Err(e) => {
                warn!("Token refresh failed, clearing stored tokens: {}", e);
                self.tokens.clear();
                None
            }
        }
    }

    async fn register(&self, credentials: &RegisterCredentials) -> Result<RegisterResponse, TransportError> {
        info!("Sending registration request for email: {}", credentials.email);

        let res = self
            .client
            .post(self.url("/auth/register/"))
            .json(credentials)
            .send()
            .await
            .map_err(|e| {
                error!("Registration request failed for email: {}: {}", credentials.email, e);
                TransportError::from(e)
            })?;

        let status = res.status();
        if !status.is_success() {
            let body: Option<Value> = res.json().await.ok();
            let message = match (status, &body) {
                (status, Some(body)) if status == StatusCode::BAD_REQUEST => field_errors(body),
                (_, Some(body)) => body.get("message").and_then(Value::as_str).map(str::to_string),
                _ => None,
            }
            .unwrap_or_else(|| REGISTRATION_FAILED.to_string());

            error!("Registration rejected for email: {} ({}): {}", credentials.email, status, message);
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let data: RegisterResponse = res.json().await?;
        info!("Registration successful for email: {}", credentials.email);
        Ok(data)
    }

    async fn check_email_availability(&self, email: &str) -> bool {
        match self.check_availability("/auth/check-email/", serde_json::json!({ "email": email })).await {
            Ok(available) => available,
            Err(e) => {
                warn!("Email availability check failed: {}", e);
                true
            }
        }
    }

    async fn check_username_availability(&self, username: &str) -> bool {
        match self
            .check_availability("/auth/check-username/", serde_json::json!({ "username": username }))
            .await
        {
            Ok(available) => available,
            Err(e) => {
                warn!("Username availability check failed: {}", e);
                true
            }
        }
    }

    async fn current_user(&self, access_token: &str) -> Result<AuthUser, TransportError> {
        let res = self
            .client
            .get(self.url("/auth/me"))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let message = server_message(res).await.unwrap_or_else(|| SESSION_CHECK_FAILED.to_string());
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(res.json().await?)
    }
}

/// Reads `{"message": "..."}` from an error response, if there is one.
async fn server_message(res: Response) -> Option<String> {
    let body: Value = res.json().await.ok()?;
    body.get("message")?.as_str().map(str::to_string)
}

/// Flattens a field-keyed validation body into one message.
///
/// Labeled field errors come first, then `non_field_errors` as-is. Only the
/// first message of each field is used.
pub(crate) fn field_errors(body: &Value) -> Option<String> {
    const FIELDS: [(&str, &str); 3] = [("email", "Email"), ("username", "Username"), ("password", "Password")];

    let mut errors: Vec<String> = FIELDS
        .iter()
        .filter_map(|(key, label)| first_message(body.get(*key)?).map(|msg| format!("{}: {}", label, msg)))
        .collect();

    if let Some(msg) = body.get("non_field_errors").and_then(first_message) {
        errors.push(msg);
    }

    if errors.is_empty() {
        None
    } else {
        Some(errors.join(". "))
    }
}

fn first_message(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.first().and_then(first_message),
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
