use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: AuthUser,
}

impl AuthResponse {
    pub fn tokens(&self) -> TokenPair {
        TokenPair {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

/// Registration input. Field names go over the wire in snake_case.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterCredentials {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub password_confirm: String,
}

/// Created-user payload as returned by the server; its shape is not fixed.
pub type RegisterResponse = serde_json::Value;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshResponse {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AvailabilityResponse {
    pub is_available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_login_credentials_wire_format() {
        let credentials = LoginCredentials {
            email: "user@example.com".into(),
            password: "secret".into(),
            remember_me: true,
        };
        let value = serde_json::to_value(&credentials).unwrap();
        assert_eq!(
            value,
            json!({"email": "user@example.com", "password": "secret", "rememberMe": true})
        );
    }

    #[test]
    fn test_register_credentials_wire_format() {
        let credentials = RegisterCredentials {
            email: "user@example.com".into(),
            username: "user_1".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            password: "pw".into(),
            password_confirm: "pw".into(),
        };
        let value = serde_json::to_value(&credentials).unwrap();
        assert_eq!(value["first_name"], "Ada");
        assert_eq!(value["last_name"], "Lovelace");
        assert_eq!(value["password_confirm"], "pw");
    }

    #[test]
    fn test_auth_response_parsing() {
        let response: AuthResponse = serde_json::from_value(json!({
            "accessToken": "a",
            "refreshToken": "r",
            "user": {"id": "7", "email": "user@example.com", "name": "User", "role": "admin"}
        }))
        .unwrap();

        assert_eq!(response.tokens(), TokenPair {
            access_token: "a".into(),
            refresh_token: "r".into(),
        });
        assert_eq!(response.user.role, "admin");
    }
}
