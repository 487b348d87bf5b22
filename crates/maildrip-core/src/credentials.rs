//! Delivery credential access
//!
//! Token refresh belongs to the auth subsystem and is out of scope here;
//! the dispatcher only checks validity before each attempt and treats a
//! stale token as a retryable failure, expecting a later pass to find a
//! refreshed one.

use chrono::{DateTime, Utc};
use maildrip_common::config::CredentialsConfig;

/// Credentials handed to the email transport
#[derive(Debug, Clone)]
pub struct AccessCredentials {
    pub access_token: String,
    /// Absent means the token does not expire
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessCredentials {
    /// A token is valid strictly before its expiry
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }
}

/// Source of the current delivery credentials
pub trait CredentialProvider: Send + Sync {
    fn current(&self) -> AccessCredentials;
}

/// Fixed credentials loaded from configuration
pub struct StaticCredentials {
    credentials: AccessCredentials,
}

impl StaticCredentials {
    /// Create a provider over a fixed token
    pub fn new(access_token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            credentials: AccessCredentials {
                access_token: access_token.into(),
                expires_at,
            },
        }
    }

    /// Build from configuration
    pub fn from_config(config: &CredentialsConfig) -> Self {
        Self::new(config.access_token.clone(), config.expires_at)
    }
}

impl CredentialProvider for StaticCredentials {
    fn current(&self) -> AccessCredentials {
        self.credentials.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_validity_against_expiry() {
        let now = Utc::now();
        let live = AccessCredentials {
            access_token: "t".into(),
            expires_at: Some(now + Duration::hours(1)),
        };
        assert!(live.is_valid(now));

        let stale = AccessCredentials {
            access_token: "t".into(),
            expires_at: Some(now - Duration::seconds(1)),
        };
        assert!(!stale.is_valid(now));

        // Expiry is exclusive
        let edge = AccessCredentials {
            access_token: "t".into(),
            expires_at: Some(now),
        };
        assert!(!edge.is_valid(now));
    }

    #[test]
    fn test_no_expiry_is_always_valid() {
        let provider = StaticCredentials::new("token", None);
        assert!(provider.current().is_valid(Utc::now()));
    }
}
