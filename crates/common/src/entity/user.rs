//! Application user

use serde::Serialize;

/// An account able to log into the application.
///
/// `id` is assigned by [`UserRepository::insert`](crate::UserRepository::insert)
/// and cannot be changed afterwards. `password` holds an already-hashed
/// credential; hashing happens before it reaches this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    id: Option<i64>,
    email: String,
    roles: Vec<String>,
    #[serde(skip_serializing)]
    password: String,
}

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: None,
            email: email.into(),
            roles: Vec::new(),
            password: String::new(),
        }
    }

    /// Rebuild a user loaded from storage
    pub(crate) fn from_stored(id: i64, email: String, roles: Vec<String>, password: String) -> Self {
        Self {
            id: Some(id),
            email,
            roles,
            password,
        }
    }

    pub(crate) fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    /// Store-generated id, `None` until persisted
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn set_email(&mut self, email: impl Into<String>) -> &mut Self {
        self.email = email.into();
        self
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn set_roles<I, S>(&mut self, roles: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn set_password(&mut self, password: impl Into<String>) -> &mut Self {
        self.password = password.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fluent_setters() {
        let mut user = User::new("placeholder@example.com");
        user.set_email("a@b.com").set_roles(["ADMIN"]).set_password("$2y$13$hash");

        assert_eq!(user.email(), "a@b.com");
        assert_eq!(user.roles(), ["ADMIN".to_string()]);
        assert_eq!(user.password(), "$2y$13$hash");
        assert!(user.has_role("ADMIN"));
        assert!(!user.has_role("USER"));
    }

    #[test]
    fn test_new_user_has_no_id() {
        let user = User::new("a@b.com");
        assert_eq!(user.id(), None);
        assert!(user.roles().is_empty());
    }

    #[test]
    fn test_password_not_serialized() {
        let mut user = User::new("a@b.com");
        user.set_password("secret-hash");

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["email"], "a@b.com");
        assert!(json.get("password").is_none());
    }
}
