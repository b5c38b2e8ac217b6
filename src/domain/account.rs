use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Cents;

/// Accounts are keyed by their identifier (an email address).
pub type AccountId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub identifier: AccountId,
    pub full_name: String,
    /// Argon2 PHC string, never the plaintext secret
    #[serde(skip_serializing)]
    pub credential: String,
    pub phone: String,
    /// Never negative at any committed state
    pub balance_cents: Cents,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with a zero balance.
    pub fn new(
        identifier: impl Into<AccountId>,
        full_name: impl Into<String>,
        credential: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            full_name: full_name.into(),
            credential: credential.into(),
            phone: phone.into(),
            balance_cents: 0,
            created_at: Utc::now(),
        }
    }
}

/// Registration input, checked before it reaches storage.
/// Everything but the secret is trimmed; the secret is hashed exactly as given,
/// the same way login verifies it.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub full_name: String,
    pub identifier: String,
    pub secret: String,
    pub phone: String,
}

impl Registration {
    pub fn new(
        full_name: impl AsRef<str>,
        identifier: impl AsRef<str>,
        secret: impl AsRef<str>,
        phone: impl AsRef<str>,
    ) -> Self {
        Self {
            full_name: full_name.as_ref().trim().to_string(),
            identifier: identifier.as_ref().trim().to_string(),
            secret: secret.as_ref().to_string(),
            phone: phone.as_ref().trim().to_string(),
        }
    }

    /// Name of the first required field left empty, if any. Phone is optional.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("full name", &self.full_name),
            ("email", &self.identifier),
            ("password", &self.secret),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

/// Order two account identifiers canonically (lower-sorted first).
/// Multi-account writes apply their legs in this order.
pub fn lock_order<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}
