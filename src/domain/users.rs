use std::collections::HashMap;

use crate::domain::{
    error::ErrorKind,
    ids::UserId,
    user::User,
};

/// Error returned when two users share an id.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("user with id {0} already exists")]
pub struct DuplicateUserError(pub UserId);

impl DuplicateUserError {
    /// The broad category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Conflict
    }
}

/// The users work can be allocated to.
///
/// Users are loaded once and never modified afterwards.
#[derive(Debug, Clone, Default)]
pub struct UserStore {
    users: Vec<User>,
    index: HashMap<UserId, usize>,
}

impl UserStore {
    /// Builds a store from previously saved users, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateUserError`] if two users share an id.
    pub fn from_users(users: impl IntoIterator<Item = User>) -> Result<Self, DuplicateUserError> {
        let mut store = Self::default();
        for user in users {
            if store.index.contains_key(user.id()) {
                return Err(DuplicateUserError(user.id().clone()));
            }
            store.index.insert(user.id().clone(), store.users.len());
            store.users.push(user);
        }
        tracing::debug!(count = store.users.len(), "loaded users");
        Ok(store)
    }

    /// Looks up a user by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&User> {
        self.index.get(id).map(|&position| &self.users[position])
    }

    /// Every user, in stored order.
    #[must_use]
    pub fn list(&self) -> &[User] {
        &self.users
    }

    /// The number of users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether there are no users.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
