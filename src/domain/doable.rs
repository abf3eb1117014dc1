//! The doable: a single unit of work.
//!
//! A doable's enumerated fields are closed Rust enums, so an invalid type,
//! priority or status cannot be represented. Text coming from outside the
//! process is parsed through [`FromStr`], which is where invalid values are
//! rejected.

use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::{CaseId, DoableId, EmptyIdError};

/// What kind of work a doable is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoableType {
    /// A task belonging to a case.
    #[default]
    Task,
    /// An incoming message.
    Email,
}

/// How urgent a doable is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Served before everything else.
    High,
    /// The default priority.
    #[default]
    Medium,
    /// Served last.
    Low,
}

/// Lifecycle state of a doable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Waiting to be allocated.
    #[default]
    Pending,
    /// Handed to a user.
    Allocated,
    /// Done. There is no way back from here.
    Completed,
}

impl DoableType {
    /// All variants, in declaration order.
    pub const ALL: [Self; 2] = [Self::Task, Self::Email];

    /// The lowercase name used in storage and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Email => "email",
        }
    }
}

impl Priority {
    /// All variants, from most to least urgent.
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    /// The lowercase name used in storage and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Sort rank: lower is served first.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

impl Status {
    /// All variants, in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Allocated, Self::Completed];

    /// The lowercase name used in storage and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Allocated => "allocated",
            Self::Completed => "completed",
        }
    }

    /// Whether the doable is waiting to be allocated.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Sort rank: pending work comes first, everything else after.
    #[must_use]
    pub const fn rank(self) -> u8 {
        if self.is_pending() { 0 } else { 1 }
    }
}

/// Error returned when text does not name a variant of an enumerated field.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("invalid {field} '{value}': must be one of {expected}")]
pub struct InvalidValueError {
    field: &'static str,
    value: String,
    expected: &'static str,
}

macro_rules! parse_enum {
    ($ty:ty, $field:literal, $expected:literal) => {
        impl FromStr for $ty {
            type Err = InvalidValueError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .into_iter()
                    .find(|variant| variant.as_str() == s)
                    .ok_or_else(|| InvalidValueError {
                        field: $field,
                        value: s.to_string(),
                        expected: $expected,
                    })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        }
    };
}

parse_enum!(DoableType, "type", "'task', 'email'");
parse_enum!(Priority, "priority", "'high', 'medium', 'low'");
parse_enum!(Status, "status", "'pending', 'allocated', 'completed'");

/// Malformed input to a doable constructor or update.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The title was empty or only whitespace.
    #[error("title must not be empty")]
    EmptyTitle,
    /// A task was created without the case it belongs to.
    #[error("a case id is required for task doables")]
    MissingCaseId,
    /// Every `message_<n>` number has been used.
    #[error("no email ids left to hand out")]
    MessageIdsExhausted,
    /// An identifier was empty.
    #[error(transparent)]
    EmptyId(#[from] EmptyIdError),
    /// An enumerated field was given an unknown value.
    #[error(transparent)]
    InvalidValue(#[from] InvalidValueError),
}

/// A unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doable {
    id: DoableId,
    title: String,
    case_id: Option<CaseId>,
    doable_type: DoableType,
    priority: Priority,
    status: Status,
    created_at: DateTime<Utc>,
}

impl Doable {
    /// Constructs a pending, medium-priority doable created now.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyTitle`] if the title is blank.
    pub fn new(
        id: DoableId,
        title: impl Into<String>,
        doable_type: DoableType,
    ) -> Result<Self, ValidationError> {
        let doable = Self {
            id,
            title: title.into(),
            case_id: None,
            doable_type,
            priority: Priority::default(),
            status: Status::default(),
            created_at: Utc::now(),
        };
        doable.validate()?;
        Ok(doable)
    }

    /// Sets the case this doable belongs to.
    #[must_use]
    pub fn with_case(mut self, case_id: Option<CaseId>) -> Self {
        self.case_id = case_id;
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the status.
    #[must_use]
    pub const fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Overrides the creation timestamp, e.g. when loading from storage.
    #[must_use]
    pub const fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(())
    }

    /// The doable's unique identifier.
    #[must_use]
    pub const fn id(&self) -> &DoableId {
        &self.id
    }

    /// Display text.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The case this doable belongs to, if any.
    #[must_use]
    pub const fn case_id(&self) -> Option<&CaseId> {
        self.case_id.as_ref()
    }

    /// What kind of work this is.
    #[must_use]
    pub const fn doable_type(&self) -> DoableType {
        self.doable_type
    }

    /// How urgent the doable is.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// When the doable was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the doable belongs to the given case.
    #[must_use]
    pub fn in_case(&self, case_id: &str) -> bool {
        self.case_id.as_deref() == Some(case_id)
    }

    /// Builds the updated doable described by `patch`.
    ///
    /// `self` is left untouched; the candidate is validated as a whole before
    /// it is returned, so a caller only ever commits a valid doable.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the patched doable is invalid.
    pub fn apply(&self, patch: &DoablePatch) -> Result<Self, ValidationError> {
        let candidate = Self {
            id: self.id.clone(),
            title: patch.title.clone().unwrap_or_else(|| self.title.clone()),
            case_id: patch
                .case_id
                .clone()
                .unwrap_or_else(|| self.case_id.clone()),
            doable_type: patch.doable_type.unwrap_or(self.doable_type),
            priority: patch.priority.unwrap_or(self.priority),
            status: patch.status.unwrap_or(self.status),
            created_at: self.created_at,
        };
        candidate.validate()?;
        Ok(candidate)
    }
}

/// Orders doables for service: pending first, then by priority, then oldest
/// first.
#[must_use]
pub fn queue_order(a: &Doable, b: &Doable) -> Ordering {
    a.status
        .rank()
        .cmp(&b.status.rank())
        .then_with(|| a.priority.rank().cmp(&b.priority.rank()))
        .then_with(|| a.created_at.cmp(&b.created_at))
}

/// The fields of a doable that can be changed after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoableField {
    /// The display text.
    Title,
    /// The case grouping key.
    CaseId,
    /// Task or email.
    Type,
    /// High, medium or low.
    Priority,
    /// Pending, allocated or completed.
    Status,
}

impl FromStr for DoableField {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(Self::Title),
            "case_id" => Ok(Self::CaseId),
            "type" => Ok(Self::Type),
            "priority" => Ok(Self::Priority),
            "status" => Ok(Self::Status),
            "id" | "created_at" => Err(PatchError::ImmutableField(s.to_string())),
            _ => Err(PatchError::UnrecognisedField(s.to_string())),
        }
    }
}

/// Error building a [`DoablePatch`] from field names and text values.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PatchError {
    /// The field does not exist on a doable.
    #[error("invalid attribute '{0}' for doable")]
    UnrecognisedField(String),
    /// The field exists but is fixed at creation.
    #[error("field '{0}' cannot be changed after creation")]
    ImmutableField(String),
    /// The value is not valid for the field.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// A set of changes to apply to a doable.
///
/// Every field is optional; `None` leaves the current value in place. For
/// `case_id`, `Some(None)` removes the doable from its case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoablePatch {
    title: Option<String>,
    case_id: Option<Option<CaseId>>,
    doable_type: Option<DoableType>,
    priority: Option<Priority>,
    status: Option<Status>,
}

impl DoablePatch {
    /// A patch that only changes the status.
    #[must_use]
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Changes the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Moves the doable to another case, or out of any case.
    #[must_use]
    pub fn with_case(mut self, case_id: Option<CaseId>) -> Self {
        self.case_id = Some(case_id);
        self
    }

    /// Changes the type.
    #[must_use]
    pub const fn with_type(mut self, doable_type: DoableType) -> Self {
        self.doable_type = Some(doable_type);
        self
    }

    /// Changes the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Changes the status.
    #[must_use]
    pub const fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets a field from its name and textual value.
    ///
    /// An empty `case_id` value removes the doable from its case.
    ///
    /// # Errors
    ///
    /// Fails if the field name is unknown or immutable, or if the value does
    /// not parse for that field.
    pub fn set(&mut self, field: &str, value: &str) -> Result<&mut Self, PatchError> {
        match field.parse::<DoableField>()? {
            DoableField::Title => self.title = Some(value.to_string()),
            DoableField::CaseId => {
                let case_id = if value.is_empty() {
                    None
                } else {
                    Some(CaseId::new(value).map_err(ValidationError::from)?)
                };
                self.case_id = Some(case_id);
            }
            DoableField::Type => {
                self.doable_type = Some(value.parse::<DoableType>().map_err(ValidationError::from)?);
            }
            DoableField::Priority => {
                self.priority = Some(value.parse::<Priority>().map_err(ValidationError::from)?);
            }
            DoableField::Status => {
                self.status = Some(value.parse::<Status>().map_err(ValidationError::from)?);
            }
        }
        Ok(self)
    }

    /// Builds a patch from `(field, value)` pairs.
    ///
    /// # Errors
    ///
    /// Fails on the first pair rejected by [`DoablePatch::set`].
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, PatchError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut patch = Self::default();
        for (field, value) in pairs {
            patch.set(field, value)?;
        }
        Ok(patch)
    }

    /// The status the patch moves the doable to, if it changes the status.
    #[must_use]
    pub const fn new_status(&self) -> Option<Status> {
        self.status
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use test_case::test_case;

    use super::*;

    fn doable(id: &str) -> Doable {
        Doable::new(DoableId::new(id).unwrap(), "Reply to client", DoableType::Email).unwrap()
    }

    fn day(n: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, n, 9, 0, 0).unwrap()
    }

    #[test]
    fn defaults_are_pending_and_medium() {
        let d = doable("message_1");
        assert_eq!(d.status(), Status::Pending);
        assert_eq!(d.priority(), Priority::Medium);
        assert_eq!(d.case_id(), None);
    }

    #[test]
    fn blank_title_is_rejected() {
        let result = Doable::new(DoableId::new("x").unwrap(), "  ", DoableType::Task);
        assert_eq!(result, Err(ValidationError::EmptyTitle));
    }

    #[test]
    fn empty_id_error_is_carried_by_cloneable_errors() {
        let error = ValidationError::from(DoableId::new("").unwrap_err());
        let patch_error = PatchError::from(error.clone());
        assert_eq!(patch_error.clone(), PatchError::Invalid(error));
    }

    #[test_case("task", DoableType::Task)]
    #[test_case("email", DoableType::Email)]
    fn parse_type(s: &str, expected: DoableType) {
        assert_eq!(s.parse::<DoableType>().unwrap(), expected);
    }

    #[test_case("urgent"; "unknown word")]
    #[test_case("High"; "wrong case")]
    #[test_case(""; "empty")]
    fn invalid_priority_is_rejected(s: &str) {
        assert!(s.parse::<Priority>().is_err());
    }

    #[test]
    fn invalid_status_names_the_field() {
        let error = "archived".parse::<Status>().unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid status 'archived': must be one of 'pending', 'allocated', 'completed'"
        );
    }

    #[test]
    fn priority_ranks_high_first() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }

    #[test]
    fn queue_order_puts_pending_first() {
        let allocated = doable("a")
            .with_priority(Priority::High)
            .with_status(Status::Allocated)
            .with_created_at(day(1));
        let pending = doable("b").with_priority(Priority::Low).with_created_at(day(5));
        assert_eq!(queue_order(&pending, &allocated), Ordering::Less);
    }

    #[test]
    fn queue_order_prefers_priority_over_age() {
        let old_low = doable("a").with_priority(Priority::Low).with_created_at(day(1));
        let new_high = doable("b").with_priority(Priority::High).with_created_at(day(3));
        assert_eq!(queue_order(&new_high, &old_low), Ordering::Less);
    }

    #[test]
    fn queue_order_breaks_ties_by_age() {
        let older = doable("a").with_created_at(day(1));
        let newer = doable("b").with_created_at(day(2));
        assert_eq!(queue_order(&older, &newer), Ordering::Less);
    }

    #[test]
    fn apply_leaves_original_untouched() {
        let original = doable("message_1");
        let updated = original
            .apply(&DoablePatch::status(Status::Allocated))
            .unwrap();
        assert_eq!(original.status(), Status::Pending);
        assert_eq!(updated.status(), Status::Allocated);
        assert_eq!(updated.created_at(), original.created_at());
    }

    #[test]
    fn apply_rejects_blank_title() {
        let original = doable("message_1");
        let result = original.apply(&DoablePatch::default().with_title(""));
        assert_eq!(result, Err(ValidationError::EmptyTitle));
    }

    #[test]
    fn patch_from_pairs() {
        let patch =
            DoablePatch::from_pairs([("priority", "high"), ("case_id", "case_9")]).unwrap();
        let updated = doable("message_1").apply(&patch).unwrap();
        assert_eq!(updated.priority(), Priority::High);
        assert_eq!(updated.case_id().map(CaseId::as_str), Some("case_9"));
    }

    #[test]
    fn empty_case_id_clears_case() {
        let original = doable("message_1").with_case(Some(CaseId::new("case_1").unwrap()));
        let patch = DoablePatch::from_pairs([("case_id", "")]).unwrap();
        assert_eq!(original.apply(&patch).unwrap().case_id(), None);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let result = DoablePatch::from_pairs([("colour", "red")]);
        assert_eq!(result, Err(PatchError::UnrecognisedField("colour".into())));
    }

    #[test_case("id")]
    #[test_case("created_at")]
    fn immutable_field_is_rejected(field: &str) {
        let result = DoablePatch::from_pairs([(field, "x")]);
        assert_eq!(result, Err(PatchError::ImmutableField(field.into())));
    }

    #[test]
    fn invalid_value_in_patch_is_rejected() {
        let result = DoablePatch::from_pairs([("status", "done")]);
        assert!(matches!(
            result,
            Err(PatchError::Invalid(ValidationError::InvalidValue(_)))
        ));
    }

    #[test]
    fn default_patch_is_empty() {
        assert!(DoablePatch::default().is_empty());
        assert!(!DoablePatch::status(Status::Completed).is_empty());
    }
}
