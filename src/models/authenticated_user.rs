use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const FALLBACK_DISPLAY_NAME: &str = "User";

/// The signed-in account as cached after the code exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub email: Option<String>,
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthenticatedUser {
    /// A token without an expiry is treated as valid until the provider rejects it.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn display_name(&self) -> &str {
        self.email
            .as_deref()
            .filter(|email| !email.is_empty())
            .unwrap_or(FALLBACK_DISPLAY_NAME)
    }
}
