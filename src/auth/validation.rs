use regex::Regex;
use std::sync::OnceLock;

use super::models::RegisterCredentials;
use crate::error::Error;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"))
}

fn username_regex() -> &'static Regex {
    static USERNAME: OnceLock<Regex> = OnceLock::new();
    USERNAME.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]{3,20}$").expect("username pattern compiles"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// 3 to 20 characters of ASCII letters, digits and underscore.
pub fn is_valid_username(username: &str) -> bool {
    username_regex().is_match(username)
}

impl RegisterCredentials {
    /// Format checks that never touch the network.
    pub fn validate(&self) -> Result<(), Error> {
        if !is_valid_email(&self.email) {
            return Err(Error::Validation("Please enter a valid email address".into()));
        }
        if !is_valid_username(&self.username) {
            return Err(Error::Validation(
                "Username must be 3-20 characters and contain only letters, numbers and underscores".into(),
            ));
        }
        if self.password.is_empty() {
            return Err(Error::Validation("Password is required".into()));
        }
        if self.password != self.password_confirm {
            return Err(Error::Validation("Passwords do not match".into()));
        }
        Ok(())
    }
}
