//! Authentication module
//!
//! Token persistence, the HTTP transport for the remote auth API, and the
//! reducer-driven session state built on top of them.

pub mod models;
pub mod session;
pub mod state;
pub mod tokens;
pub mod transport;
pub mod validation;

pub use models::{AuthResponse, AuthUser, LoginCredentials, RegisterCredentials, RegisterResponse, TokenPair};
pub use session::AuthSession;
pub use state::{reduce, AuthAction, AuthState};
pub use tokens::{TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
pub use transport::{AuthTransport, HttpAuthTransport};
pub use validation::{is_valid_email, is_valid_username};
