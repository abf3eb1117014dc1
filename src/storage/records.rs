//! On-disk representations of doables, users and allocations.
//!
//! Records use snake_case keys, lowercase enum values and ISO-8601
//! timestamps, so the data files stay readable by other tools. They are
//! converted into domain types with [`TryFrom`], which is where validation
//! happens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    doable::InvalidValueError, Allocation, CaseId, Doable, DoableId, DoableType, EmptyIdError,
    MissingNameError, Priority, Status, User, UserId, ValidationError,
};

/// A record that could not be turned into a domain value.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    /// A doable record failed validation.
    #[error("invalid doable '{id}': {source}")]
    Doable {
        /// The id as stored.
        id: String,
        /// Why it was rejected.
        source: ValidationError,
    },
    /// A user record failed validation.
    #[error("invalid user '{id}': {source}")]
    User {
        /// The id as stored, if any.
        id: String,
        /// Why it was rejected.
        source: UserRecordError,
    },
    /// An allocation record had an empty identifier.
    #[error("invalid allocation of doable '{doable_id}': {source}")]
    Allocation {
        /// The doable id as stored.
        doable_id: String,
        /// Why it was rejected.
        source: EmptyIdError,
    },
}

/// Why a user record was rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UserRecordError {
    /// A required name was blank.
    #[error(transparent)]
    MissingName(#[from] MissingNameError),
    /// The stored preferred type is not a known type.
    #[error(transparent)]
    PreferredType(#[from] InvalidValueError),
}

/// A stored doable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoableRecord {
    id: String,
    title: String,
    #[serde(default)]
    case_id: Option<String>,
    #[serde(rename = "type", default)]
    doable_type: DoableType,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    status: Status,
    #[serde(with = "timestamp")]
    created_at: DateTime<Utc>,
}

impl From<&Doable> for DoableRecord {
    fn from(doable: &Doable) -> Self {
        Self {
            id: doable.id().to_string(),
            title: doable.title().to_string(),
            case_id: doable.case_id().map(ToString::to_string),
            doable_type: doable.doable_type(),
            priority: doable.priority(),
            status: doable.status(),
            created_at: doable.created_at(),
        }
    }
}

impl TryFrom<DoableRecord> for Doable {
    type Error = RecordError;

    fn try_from(record: DoableRecord) -> Result<Self, Self::Error> {
        let DoableRecord {
            id,
            title,
            case_id,
            doable_type,
            priority,
            status,
            created_at,
        } = record;

        build_doable(id.clone(), title, case_id, doable_type)
            .map(|doable| {
                doable
                    .with_priority(priority)
                    .with_status(status)
                    .with_created_at(created_at)
            })
            .map_err(|source| RecordError::Doable { id, source })
    }
}

fn build_doable(
    id: String,
    title: String,
    case_id: Option<String>,
    doable_type: DoableType,
) -> Result<Doable, ValidationError> {
    // an empty case id is stored by some clients to mean "no case"
    let case_id = case_id
        .filter(|c| !c.is_empty())
        .map(CaseId::new)
        .transpose()?;
    Ok(Doable::new(DoableId::new(id)?, title, doable_type)?.with_case(case_id))
}

/// A stored user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    id: Option<String>,
    user_name: String,
    first_name: String,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    preferred_doable_type: Option<String>,
}

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        Self {
            id: Some(user.id().to_string()),
            user_name: user.user_name().to_string(),
            first_name: user.first_name().to_string(),
            last_name: user.last_name().map(ToString::to_string),
            preferred_doable_type: user
                .preferred_doable_type()
                .map(|t| t.as_str().to_string()),
        }
    }
}

impl TryFrom<UserRecord> for User {
    type Error = RecordError;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        let UserRecord {
            id,
            user_name,
            first_name,
            last_name,
            preferred_doable_type,
        } = record;

        let user = build_user(user_name, first_name, preferred_doable_type).map_err(|source| {
            RecordError::User {
                id: id.clone().unwrap_or_default(),
                source,
            }
        })?;

        // a missing or empty id keeps the generated one
        Ok(match id.map(UserId::new) {
            Some(Ok(id)) => user.with_id(id),
            _ => user,
        }
        .with_last_name(last_name))
    }
}

fn build_user(
    user_name: String,
    first_name: String,
    preferred_doable_type: Option<String>,
) -> Result<User, UserRecordError> {
    let preferred = preferred_doable_type
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<DoableType>())
        .transpose()?;
    Ok(User::new(user_name, first_name)?.with_preferred_type(preferred))
}

/// A stored allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    doable_id: String,
    user_id: String,
    #[serde(with = "timestamp")]
    allocated_at: DateTime<Utc>,
    #[serde(default)]
    is_case_allocation: bool,
}

impl From<&Allocation> for AllocationRecord {
    fn from(allocation: &Allocation) -> Self {
        Self {
            doable_id: allocation.doable_id().to_string(),
            user_id: allocation.user_id().to_string(),
            allocated_at: allocation.allocated_at(),
            is_case_allocation: allocation.is_case_allocation(),
        }
    }
}

impl TryFrom<AllocationRecord> for Allocation {
    type Error = RecordError;

    fn try_from(record: AllocationRecord) -> Result<Self, Self::Error> {
        let AllocationRecord {
            doable_id,
            user_id,
            allocated_at,
            is_case_allocation,
        } = record;

        let (doable, user) = DoableId::new(doable_id.clone())
            .and_then(|doable| UserId::new(user_id).map(|user| (doable, user)))
            .map_err(|source| RecordError::Allocation { doable_id, source })?;

        Ok(Self::new(doable, user)
            .with_allocated_at(allocated_at)
            .with_case_allocation(is_case_allocation))
    }
}

/// Timestamps are written as RFC 3339. On load, timestamps without an offset
/// are read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.and_utc())
            })
            .or_else(|_| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").map(|dt| dt.and_utc())
            })
    }
}
