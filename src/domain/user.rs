use crate::domain::{doable::DoableType, ids::UserId};

/// Error returned when a user is missing a required name.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("{0} must not be empty")]
pub struct MissingNameError(&'static str);

/// Someone who can be allocated work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    user_name: String,
    first_name: String,
    last_name: Option<String>,
    preferred_doable_type: Option<DoableType>,
}

impl User {
    /// Creates a user with a freshly generated id.
    ///
    /// # Errors
    ///
    /// Returns [`MissingNameError`] if the user name or first name is blank.
    pub fn new(
        user_name: impl Into<String>,
        first_name: impl Into<String>,
    ) -> Result<Self, MissingNameError> {
        let user_name = user_name.into();
        let first_name = first_name.into();
        if user_name.trim().is_empty() {
            return Err(MissingNameError("user name"));
        }
        if first_name.trim().is_empty() {
            return Err(MissingNameError("first name"));
        }
        Ok(Self {
            id: UserId::generate(),
            user_name,
            first_name,
            last_name: None,
            preferred_doable_type: None,
        })
    }

    /// Replaces the generated id with a known one.
    #[must_use]
    pub fn with_id(mut self, id: UserId) -> Self {
        self.id = id;
        self
    }

    /// Sets the last name.
    #[must_use]
    pub fn with_last_name(mut self, last_name: Option<String>) -> Self {
        self.last_name = last_name;
        self
    }

    /// Sets the kind of work the user prefers to be given.
    #[must_use]
    pub const fn with_preferred_type(mut self, doable_type: Option<DoableType>) -> Self {
        self.preferred_doable_type = doable_type;
        self
    }

    /// The user's unique identifier.
    #[must_use]
    pub const fn id(&self) -> &UserId {
        &self.id
    }

    /// Login-style handle.
    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Given name.
    #[must_use]
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    /// Family name, if known.
    #[must_use]
    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    /// The kind of work allocation should favour for this user.
    #[must_use]
    pub const fn preferred_doable_type(&self) -> Option<DoableType> {
        self.preferred_doable_type
    }

    /// "First Last", or just the first name.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.last_name.as_ref().map_or_else(
            || self.first_name.clone(),
            |last| format!("{} {last}", self.first_name),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_rejected() {
        assert_eq!(User::new("", "Ada"), Err(MissingNameError("user name")));
        assert_eq!(User::new("ada", " "), Err(MissingNameError("first name")));
    }

    #[test]
    fn new_users_get_distinct_ids() {
        let a = User::new("ada", "Ada").unwrap();
        let b = User::new("ada", "Ada").unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn display_name_includes_last_name_when_present() {
        let user = User::new("ada", "Ada").unwrap();
        assert_eq!(user.display_name(), "Ada");
        let user = user.with_last_name(Some("Lovelace".into()));
        assert_eq!(user.display_name(), "Ada Lovelace");
    }
}
