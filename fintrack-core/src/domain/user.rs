//! User domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The aggregate root every category, transaction and budget hangs off
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: Self::normalize_username(&username.into()),
            created_at: Utc::now(),
        }
    }

    /// Usernames are compared case-insensitively and stored lowercase
    pub fn normalize_username(username: &str) -> String {
        username.trim().to_lowercase()
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.username.is_empty() {
            return Err("username cannot be empty");
        }
        if self.username.chars().any(char::is_whitespace) {
            return Err("username cannot contain whitespace");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_creation() {
        let user = User::new("  Alice ");
        assert_eq!(user.username, "alice");
        assert!(user.validate().is_ok());
    }

    #[test]
    fn test_user_validation() {
        assert!(User::new("").validate().is_err());
        assert!(User::new("two words").validate().is_err());
    }
}
