//! Common types for maildrip

use serde::{Deserialize, Serialize};

/// Unique identifier for campaigns (store document id)
pub type CampaignId = String;

/// A single campaign recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub email: String,
}

impl Recipient {
    /// Create a new recipient
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_display() {
        let recipient = Recipient::new("Ada", "ada@example.com");
        assert_eq!(recipient.to_string(), "Ada <ada@example.com>");
    }

    #[test]
    fn test_recipient_serde_shape() {
        let recipient = Recipient::new("Ada", "ada@example.com");
        let value = serde_json::to_value(&recipient).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"name": "Ada", "email": "ada@example.com"})
        );
    }
}
