//! Validated identifier types.
//!
//! Identifiers are plain strings on disk, but must never be empty. Each kind of
//! identifier gets its own newtype so a user id cannot be passed where a doable
//! id is expected.

use std::{
    borrow::Borrow,
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
    str::FromStr,
};

use non_empty_string::NonEmptyString;

/// Error returned when an identifier is constructed from an empty string.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
#[error("identifier must not be empty")]
pub struct EmptyIdError;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
        pub struct $name(NonEmptyString);

        impl $name {
            /// Creates a new identifier.
            ///
            /// # Errors
            ///
            /// Returns [`EmptyIdError`] if the string is empty.
            pub fn new(s: impl Into<String>) -> Result<Self, EmptyIdError> {
                NonEmptyString::new(s.into())
                    .map(Self)
                    .map_err(|_| EmptyIdError)
            }

            /// Returns the string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        // Hashes as the underlying `str` so maps keyed by this type can be
        // queried with a `&str`.
        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.as_str().hash(state);
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.as_str()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &Self::Target {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = EmptyIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = EmptyIdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = EmptyIdError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

identifier! {
    /// Unique identifier of a doable, e.g. `message_12` or `case_setup_42`.
    DoableId
}

identifier! {
    /// Unique identifier of a user.
    UserId
}

identifier! {
    /// Grouping key shared by the doables of one case, e.g. `case_42`.
    CaseId
}

impl UserId {
    /// Generates a fresh random identifier from a v4 UUID.
    ///
    /// # Panics
    ///
    /// Never in practice: a formatted UUID is never empty.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string()).expect("a UUID is never empty")
    }
}

impl CaseId {
    /// The case number: everything after the last underscore.
    ///
    /// An id without underscores is its own case number.
    #[must_use]
    pub fn number(&self) -> &str {
        self.as_str()
            .rsplit_once('_')
            .map_or(self.as_str(), |(_, number)| number)
    }
}
