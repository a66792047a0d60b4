use serde::Serialize;

use super::models::AuthUser;
use crate::error::AuthError;

/// Authentication state as seen by the front end.
///
/// `is_authenticated` is true exactly when `user` is present. Only [`reduce`]
/// produces new values of this type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub user: Option<AuthUser>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<AuthError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    LoginStart,
    LoginSuccess(AuthUser),
    LoginFailure(AuthError),
    Logout,
    ClearError,
    SetUser(Option<AuthUser>),
}

impl AuthAction {
    pub fn name(&self) -> &'static str {
        match self {
            AuthAction::LoginStart => "LOGIN_START",
            AuthAction::LoginSuccess(_) => "LOGIN_SUCCESS",
            AuthAction::LoginFailure(_) => "LOGIN_FAILURE",
            AuthAction::Logout => "LOGOUT",
            AuthAction::ClearError => "CLEAR_ERROR",
            AuthAction::SetUser(_) => "SET_USER",
        }
    }
}

/// Pure transition function: `(state, action) -> state`.
pub fn reduce(state: &AuthState, action: AuthAction) -> AuthState {
    match action {
        AuthAction::LoginStart => AuthState {
            is_loading: true,
            error: None,
            ..state.clone()
        },
        AuthAction::LoginSuccess(user) => AuthState {
            user: Some(user),
            is_authenticated: true,
            is_loading: false,
            error: None,
        },
        AuthAction::LoginFailure(error) => AuthState {
            user: None,
            is_authenticated: false,
            is_loading: false,
            error: Some(error),
        },
        AuthAction::Logout => AuthState::default(),
        AuthAction::ClearError => AuthState {
            error: None,
            ..state.clone()
        },
        AuthAction::SetUser(user) => AuthState {
            is_authenticated: user.is_some(),
            user,
            ..state.clone()
        },
    }
}
