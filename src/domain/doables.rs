//! In-memory store of doables.
//!
//! The [`DoableStore`] knows nothing about the filesystem. It keeps doables in
//! insertion order, which is the tie-breaker wherever two doables (or two
//! cases) are otherwise equal, and owns the counter used to number email
//! doables.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use nonempty::NonEmpty;
use tracing::instrument;

use crate::domain::{
    doable::{
        queue_order, Doable, DoablePatch, DoableType, PatchError, Priority, Status,
        ValidationError,
    },
    error::ErrorKind,
    ids::{CaseId, DoableId},
};

const MESSAGE_PREFIX: &str = "message_";
const CASE_SETUP_TITLE: &str = "set up the case";

/// Errors raised by [`DoableStore`] operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DoableStoreError {
    /// No doable has the given id.
    #[error("no doable found with id {0}")]
    NotFound(String),
    /// A doable with the given id already exists.
    #[error("doable with id {0} already exists")]
    Conflict(DoableId),
    /// The doable, or the doable an update would produce, is invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The requested change could not be expressed as a patch.
    #[error(transparent)]
    Patch(#[from] PatchError),
}

impl DoableStoreError {
    /// The broad category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Validation(_)
            | Self::Patch(PatchError::Invalid(_) | PatchError::ImmutableField(_)) => {
                ErrorKind::Validation
            }
            Self::Patch(PatchError::UnrecognisedField(_)) => ErrorKind::UnrecognisedField,
        }
    }
}

/// The inputs needed to create a doable; the id is generated by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDoable {
    /// Display text.
    pub title: String,
    /// Task or email.
    pub doable_type: DoableType,
    /// The case the doable belongs to. Required for tasks.
    pub case_id: Option<CaseId>,
    /// Defaults to [`Priority::Medium`].
    pub priority: Option<Priority>,
}

/// The doables of one case, in queue order.
#[derive(Debug, Clone)]
pub struct CaseGroup<'a> {
    /// The shared case id.
    pub case_id: &'a CaseId,
    /// Every doable in the case, in queue order.
    pub doables: NonEmpty<&'a Doable>,
}

impl CaseGroup<'_> {
    /// Whether no doable in the case has been allocated or completed yet.
    #[must_use]
    pub fn is_all_pending(&self) -> bool {
        self.doables.iter().all(|d| d.status().is_pending())
    }

    /// Whether the case contains at least one doable of the given type.
    #[must_use]
    pub fn contains_type(&self, doable_type: DoableType) -> bool {
        self.doables.iter().any(|d| d.doable_type() == doable_type)
    }

    /// Creation time of the oldest doable in the case.
    #[must_use]
    pub fn oldest_created_at(&self) -> DateTime<Utc> {
        self.doables
            .tail
            .iter()
            .fold(self.doables.head.created_at(), |oldest, d| {
                oldest.min(d.created_at())
            })
    }
}

/// An in-memory collection of doables.
#[derive(Debug, Clone, Default)]
pub struct DoableStore {
    /// Doables in insertion order.
    doables: Vec<Doable>,
    /// Position of each doable in `doables`.
    index: HashMap<DoableId, usize>,
    /// Highest `message_<n>` number handed out or seen so far.
    message_counter: u64,
}

impl DoableStore {
    /// Builds a store from previously saved doables.
    ///
    /// The email counter is seeded from the highest `message_<n>` id found.
    ///
    /// # Errors
    ///
    /// Returns [`DoableStoreError::Conflict`] if two doables share an id.
    pub fn from_doables(doables: impl IntoIterator<Item = Doable>) -> Result<Self, DoableStoreError> {
        let mut store = Self::default();
        for doable in doables {
            store.add(doable)?;
        }
        tracing::debug!(
            count = store.len(),
            message_counter = store.message_counter,
            "loaded doables"
        );
        Ok(store)
    }

    /// The number of doables in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.doables.len()
    }

    /// Whether the store holds no doables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.doables.is_empty()
    }

    /// The highest email number handed out or seen so far.
    #[must_use]
    pub const fn message_counter(&self) -> u64 {
        self.message_counter
    }

    /// Iterates over every doable in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Doable> {
        self.doables.iter()
    }

    /// Generates the id a new doable would be stored under.
    ///
    /// - emails are numbered sequentially: `message_<n>`
    /// - tasks are named after their title and case number: `<title>_<n>`, or
    ///   `case_setup_<n>` for the "Set up the case" task
    ///
    /// Generating an email id consumes a number even if the doable is never
    /// added.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingCaseId`] for a task without a case,
    /// or [`ValidationError::MessageIdsExhausted`] once the email counter is
    /// at its maximum.
    #[instrument(level = "debug", skip(self))]
    pub fn generate_id(
        &mut self,
        title: &str,
        doable_type: DoableType,
        case_id: Option<&CaseId>,
    ) -> Result<DoableId, ValidationError> {
        let id = match doable_type {
            DoableType::Email => {
                self.message_counter = self
                    .message_counter
                    .checked_add(1)
                    .ok_or(ValidationError::MessageIdsExhausted)?;
                format!("{MESSAGE_PREFIX}{}", self.message_counter)
            }
            DoableType::Task => {
                let case_number = case_id.ok_or(ValidationError::MissingCaseId)?.number();
                if title.to_lowercase() == CASE_SETUP_TITLE {
                    format!("case_setup_{case_number}")
                } else {
                    format!("{}_{case_number}", title.replace(' ', "_").to_lowercase())
                }
            }
        };
        Ok(DoableId::new(id)?)
    }

    /// Adds a doable to the store.
    ///
    /// # Errors
    ///
    /// Returns [`DoableStoreError::Conflict`] if the id is already taken.
    pub fn add(&mut self, doable: Doable) -> Result<&Doable, DoableStoreError> {
        if self.index.contains_key(doable.id()) {
            return Err(DoableStoreError::Conflict(doable.id().clone()));
        }

        if let Some(number) = message_number(doable.id()) {
            self.message_counter = self.message_counter.max(number);
        }

        let position = self.doables.len();
        self.index.insert(doable.id().clone(), position);
        self.doables.push(doable);
        Ok(&self.doables[position])
    }

    /// Generates an id for a new doable, then constructs and adds it.
    ///
    /// # Errors
    ///
    /// Fails if the id cannot be generated, the doable is invalid, or the
    /// generated id is already taken.
    #[instrument(level = "debug", skip(self))]
    pub fn create(&mut self, new: NewDoable) -> Result<&Doable, DoableStoreError> {
        let NewDoable {
            title,
            doable_type,
            case_id,
            priority,
        } = new;

        let id = self.generate_id(&title, doable_type, case_id.as_ref())?;
        let doable = Doable::new(id, title, doable_type)?
            .with_case(case_id)
            .with_priority(priority.unwrap_or_default());

        let doable = self.add(doable)?;
        tracing::info!("Created doable: {}", doable.id());
        Ok(doable)
    }

    /// Looks up a doable by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Doable> {
        self.index.get(id).map(|&position| &self.doables[position])
    }

    /// The pending doable that should be served next, optionally restricted to
    /// one type.
    ///
    /// Doables are ranked by [`queue_order`]; among equals the one added first
    /// wins.
    #[must_use]
    pub fn oldest_pending(&self, doable_type: Option<DoableType>) -> Option<&Doable> {
        self.next_pending(doable_type, |_| false)
    }

    /// As [`DoableStore::oldest_pending`], passing over doables for which
    /// `skip` returns `true`.
    #[must_use]
    pub fn next_pending(
        &self,
        doable_type: Option<DoableType>,
        skip: impl Fn(&Doable) -> bool,
    ) -> Option<&Doable> {
        self.doables
            .iter()
            .filter(|d| d.status().is_pending())
            .filter(|d| doable_type.is_none_or(|t| d.doable_type() == t))
            .filter(|d| !skip(d))
            .min_by(|a, b| queue_order(a, b))
    }

    /// Every doable in the given case, in queue order.
    #[must_use]
    pub fn by_case(&self, case_id: &str) -> Vec<&Doable> {
        let mut doables: Vec<_> = self.doables.iter().filter(|d| d.in_case(case_id)).collect();
        doables.sort_by(|a, b| queue_order(a, b));
        doables
    }

    /// Partitions the doables that belong to a case by their case.
    ///
    /// Groups are returned in the order their first doable was added; each
    /// group is in queue order. Doables without a case are left out.
    #[must_use]
    pub fn grouped_by_case(&self) -> Vec<CaseGroup<'_>> {
        let mut positions: HashMap<&CaseId, usize> = HashMap::new();
        let mut groups: Vec<(&CaseId, Vec<&Doable>)> = Vec::new();

        for doable in &self.doables {
            let Some(case_id) = doable.case_id() else {
                continue;
            };
            let position = *positions.entry(case_id).or_insert_with(|| {
                groups.push((case_id, Vec::new()));
                groups.len() - 1
            });
            groups[position].1.push(doable);
        }

        groups
            .into_iter()
            .filter_map(|(case_id, mut doables)| {
                doables.sort_by(|a, b| queue_order(a, b));
                NonEmpty::from_vec(doables).map(|doables| CaseGroup { case_id, doables })
            })
            .collect()
    }

    /// Applies `patch` to the doable with the given id.
    ///
    /// The updated doable is built and validated in full before it replaces
    /// the stored one, so a failed update changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DoableStoreError::NotFound`] for an unknown id, or
    /// [`DoableStoreError::Validation`] if the result would be invalid.
    #[instrument(level = "debug", skip(self))]
    pub fn update(&mut self, id: &str, patch: &DoablePatch) -> Result<&Doable, DoableStoreError> {
        let position = *self
            .index
            .get(id)
            .ok_or_else(|| DoableStoreError::NotFound(id.to_string()))?;

        let candidate = self.doables[position].apply(patch)?;
        self.doables[position] = candidate;
        Ok(&self.doables[position])
    }

    /// Applies textual `(field, value)` changes to the doable with the given
    /// id.
    ///
    /// # Errors
    ///
    /// As [`DoableStore::update`], plus [`DoableStoreError::Patch`] if a field
    /// is unknown, immutable, or given an invalid value.
    pub fn update_fields<'a, I>(&mut self, id: &str, changes: I) -> Result<&Doable, DoableStoreError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        if !self.index.contains_key(id) {
            return Err(DoableStoreError::NotFound(id.to_string()));
        }
        let patch = DoablePatch::from_pairs(changes)?;
        self.update(id, &patch)
    }

    /// Moves the doable with the given id to a new status.
    ///
    /// # Errors
    ///
    /// Returns [`DoableStoreError::NotFound`] for an unknown id.
    pub fn set_status(&mut self, id: &str, status: Status) -> Result<&Doable, DoableStoreError> {
        self.update(id, &DoablePatch::status(status))
    }
}

/// The `<n>` of a `message_<n>` id, if the id has that shape.
fn message_number(id: &str) -> Option<u64> {
    id.strip_prefix(MESSAGE_PREFIX)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use test_case::test_case;

    use super::*;

    fn day(n: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, n, 9, 0, 0).unwrap()
    }

    fn case(id: &str) -> CaseId {
        CaseId::new(id).unwrap()
    }

    fn email(id: &str, priority: Priority, created: u32) -> Doable {
        Doable::new(DoableId::new(id).unwrap(), "Reply", DoableType::Email)
            .unwrap()
            .with_priority(priority)
            .with_created_at(day(created))
    }

    fn task(id: &str, case_id: &str, created: u32) -> Doable {
        Doable::new(DoableId::new(id).unwrap(), "Do it", DoableType::Task)
            .unwrap()
            .with_case(Some(case(case_id)))
            .with_created_at(day(created))
    }

    #[test]
    fn email_ids_are_sequential() {
        let mut store = DoableStore::default();
        let first = store.generate_id("Hi", DoableType::Email, None).unwrap();
        let second = store.generate_id("Hi", DoableType::Email, None).unwrap();
        assert_eq!(first.as_str(), "message_1");
        assert_eq!(second.as_str(), "message_2");
    }

    #[test]
    fn email_counter_is_seeded_from_loaded_ids() {
        let mut store =
            DoableStore::from_doables([email("message_3", Priority::Medium, 1)]).unwrap();
        assert_eq!(store.message_counter(), 3);
        let id = store.generate_id("Hi", DoableType::Email, None).unwrap();
        assert_eq!(id.as_str(), "message_4");
    }

    #[test]
    fn non_numeric_message_ids_do_not_move_the_counter() {
        let store = DoableStore::from_doables([
            email("message_7", Priority::Medium, 1),
            email("message_draft", Priority::Medium, 2),
        ])
        .unwrap();
        assert_eq!(store.message_counter(), 7);
    }

    #[test_case("Set up the case", "case_42", "case_setup_42"; "setup task")]
    #[test_case("SET UP THE CASE", "case_42", "case_setup_42"; "setup task any case")]
    #[test_case("Call the Client", "case_42", "call_the_client_42"; "slugged title")]
    #[test_case("Review", "big_case_7", "review_7"; "case number after last underscore")]
    fn task_ids(title: &str, case_id: &str, expected: &str) {
        let mut store = DoableStore::default();
        let id = store
            .generate_id(title, DoableType::Task, Some(&case(case_id)))
            .unwrap();
        assert_eq!(id.as_str(), expected);
    }

    #[test]
    fn task_without_case_is_rejected() {
        let mut store = DoableStore::default();
        let result = store.generate_id("Review", DoableType::Task, None);
        assert_eq!(result, Err(ValidationError::MissingCaseId));
    }

    #[test]
    fn exhausted_email_counter_is_an_error() {
        let mut store =
            DoableStore::from_doables([email("message_18446744073709551615", Priority::Medium, 1)])
                .unwrap();

        let result = store.generate_id("Hi", DoableType::Email, None);

        assert_eq!(result, Err(ValidationError::MessageIdsExhausted));
        assert_eq!(store.message_counter(), u64::MAX);
    }

    #[test]
    fn generate_id_is_deterministic_for_tasks() {
        let mut store = DoableStore::default();
        let a = store.generate_id("Review", DoableType::Task, Some(&case("case_1")));
        let b = store.generate_id("Review", DoableType::Task, Some(&case("case_1")));
        assert_eq!(a, b);
    }

    #[test]
    fn duplicate_add_conflicts() {
        let mut store = DoableStore::default();
        store.add(email("message_1", Priority::Medium, 1)).unwrap();
        let result = store.add(email("message_1", Priority::High, 2));
        assert!(matches!(result, Err(DoableStoreError::Conflict(_))));
        assert_eq!(store.get("message_1").unwrap().priority(), Priority::Medium);
    }

    #[test]
    fn create_generates_id_and_applies_priority() {
        let mut store = DoableStore::default();
        let doable = store
            .create(NewDoable {
                title: "Draft letter".into(),
                doable_type: DoableType::Task,
                case_id: Some(case("case_5")),
                priority: Some(Priority::High),
            })
            .unwrap();
        assert_eq!(doable.id().as_str(), "draft_letter_5");
        assert_eq!(doable.priority(), Priority::High);
        assert_eq!(doable.status(), Status::Pending);
    }

    #[test]
    fn creating_the_same_task_twice_conflicts() {
        let mut store = DoableStore::default();
        let new = NewDoable {
            title: "Draft letter".into(),
            doable_type: DoableType::Task,
            case_id: Some(case("case_5")),
            priority: None,
        };
        store.create(new.clone()).unwrap();
        let result = store.create(new);
        assert!(matches!(result, Err(DoableStoreError::Conflict(_))));
    }

    #[test]
    fn oldest_pending_prefers_priority_over_age() {
        let store = DoableStore::from_doables([
            email("message_1", Priority::Low, 1),
            email("message_2", Priority::High, 3),
            email("message_3", Priority::Medium, 2),
        ])
        .unwrap();
        let oldest = store.oldest_pending(None).unwrap();
        assert_eq!(oldest.id().as_str(), "message_2");
    }

    #[test]
    fn oldest_pending_breaks_ties_by_age() {
        let store = DoableStore::from_doables([
            email("message_1", Priority::Medium, 2),
            email("message_2", Priority::Medium, 1),
        ])
        .unwrap();
        assert_eq!(store.oldest_pending(None).unwrap().id().as_str(), "message_2");
    }

    #[test]
    fn oldest_pending_skips_non_pending_and_filters_type() {
        let store = DoableStore::from_doables([
            email("message_1", Priority::High, 1).with_status(Status::Allocated),
            task("review_1", "case_1", 2),
            email("message_2", Priority::Low, 3),
        ])
        .unwrap();
        assert_eq!(
            store.oldest_pending(Some(DoableType::Email)).unwrap().id().as_str(),
            "message_2"
        );
        assert_eq!(
            store.oldest_pending(Some(DoableType::Task)).unwrap().id().as_str(),
            "review_1"
        );
    }

    #[test]
    fn next_pending_passes_over_skipped_doables() {
        let store = DoableStore::from_doables([
            email("message_1", Priority::High, 1),
            email("message_2", Priority::Low, 2),
        ])
        .unwrap();

        let next = store.next_pending(None, |d| d.id().as_str() == "message_1");

        assert_eq!(next.unwrap().id().as_str(), "message_2");
        assert!(store.next_pending(None, |_| true).is_none());
    }

    #[test]
    fn oldest_pending_is_none_when_nothing_is_pending() {
        let store = DoableStore::from_doables([
            email("message_1", Priority::High, 1).with_status(Status::Completed),
        ])
        .unwrap();
        assert!(store.oldest_pending(None).is_none());
        assert!(DoableStore::default().oldest_pending(None).is_none());
    }

    #[test]
    fn by_case_is_in_queue_order() {
        let store = DoableStore::from_doables([
            task("b_1", "case_1", 2),
            task("a_1", "case_1", 1).with_status(Status::Allocated),
            task("c_2", "case_2", 1),
            task("d_1", "case_1", 3),
        ])
        .unwrap();
        let ids: Vec<_> = store.by_case("case_1").iter().map(|d| d.id().as_str()).collect();
        assert_eq!(ids, ["b_1", "d_1", "a_1"]);
    }

    #[test]
    fn grouped_by_case_keeps_first_appearance_order() {
        let store = DoableStore::from_doables([
            task("x_2", "case_2", 5),
            email("message_1", Priority::High, 1),
            task("y_1", "case_1", 2),
            task("z_2", "case_2", 1),
        ])
        .unwrap();
        let groups = store.grouped_by_case();
        let summary: Vec<(&str, Vec<&str>)> = groups
            .iter()
            .map(|g| {
                (
                    g.case_id.as_str(),
                    g.doables.iter().map(|d| d.id().as_str()).collect(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            [("case_2", vec!["z_2", "x_2"]), ("case_1", vec!["y_1"])]
        );
        assert_eq!(groups[0].oldest_created_at(), day(1));
    }

    #[test]
    fn update_changes_status() {
        let mut store =
            DoableStore::from_doables([email("message_1", Priority::Medium, 1)]).unwrap();
        store.set_status("message_1", Status::Allocated).unwrap();
        assert_eq!(store.get("message_1").unwrap().status(), Status::Allocated);
    }

    #[test]
    fn update_unknown_doable_is_not_found() {
        let mut store = DoableStore::default();
        let error = store.set_status("nope", Status::Allocated).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn update_fields_rejects_unknown_field() {
        let mut store =
            DoableStore::from_doables([email("message_1", Priority::Medium, 1)]).unwrap();
        let error = store
            .update_fields("message_1", [("colour", "red")])
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UnrecognisedField);
    }

    #[test]
    fn failed_update_leaves_doable_unchanged() {
        let mut store =
            DoableStore::from_doables([email("message_1", Priority::Medium, 1)]).unwrap();
        let error = store
            .update_fields("message_1", [("priority", "high"), ("status", "done")])
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(store.get("message_1").unwrap().priority(), Priority::Medium);
    }
}
