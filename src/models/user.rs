//! User record served from the backing store

use serde::{Deserialize, Serialize};

/// A user as stored and as returned by `GET /users/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

impl User {
    pub fn new(id: u64, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
        }
    }

    /// Cache key for a user id.
    pub fn cache_key(id: u64) -> String {
        format!("user:{}", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key() {
        assert_eq!(User::cache_key(42), "user:42");
    }

    #[test]
    fn test_user_serialize() {
        let user = User::new(1, "Alice Martin", "alice@example.com");
        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(
            json,
            r#"{"id":1,"name":"Alice Martin","email":"alice@example.com"}"#
        );
    }
}
