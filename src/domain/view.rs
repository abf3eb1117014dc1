// AllocationView - a flattened, borrowed read model of the active allocations.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    allocations::Allocations,
    doable::{DoableType, Priority, Status},
    doables::DoableStore,
    ids::CaseId,
    users::UserStore,
};

/// One allocation joined with its doable and user.
///
/// Borrows from the stores it was built from, so it is cheap to build and
/// serialize but cannot outlive them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationView<'a> {
    /// The allocated doable's id.
    pub doable_id: &'a str,
    /// The allocated doable's title.
    pub doable_title: &'a str,
    /// Task or email.
    pub doable_type: DoableType,
    /// The case the doable belongs to, if any.
    pub case_id: Option<&'a str>,
    /// When the doable was created.
    pub created_at: DateTime<Utc>,
    /// Priority of the doable.
    pub priority: Priority,
    /// Current status of the doable.
    pub status: Status,
    /// The user the doable is allocated to.
    pub user_id: &'a str,
    /// The user's login name.
    pub user_name: &'a str,
    /// The user's first name.
    pub user_first_name: &'a str,
    /// The user's last name, if known.
    pub user_last_name: Option<&'a str>,
    /// The kind of work the user prefers.
    pub user_preferred_type: Option<DoableType>,
    /// When the allocation was made.
    pub allocated_at: DateTime<Utc>,
    /// Whether the allocation was part of a whole-case allocation.
    pub is_case_allocation: bool,
}

impl<'a> AllocationView<'a> {
    /// Builds the view of every allocation whose doable and user both exist.
    ///
    /// Rows are ordered by priority, then by the age of the doable. Rows that
    /// compare equal keep the order of the allocations collection.
    #[must_use]
    pub fn build(
        allocations: &'a Allocations,
        doables: &'a DoableStore,
        users: &'a UserStore,
    ) -> Vec<Self> {
        let mut rows: Vec<Self> = allocations
            .iter()
            .filter_map(|allocation| {
                let Some(doable) = doables.get(allocation.doable_id()) else {
                    tracing::debug!(doable_id = %allocation.doable_id(), "skipping allocation of unknown doable");
                    return None;
                };
                let Some(user) = users.get(allocation.user_id()) else {
                    tracing::debug!(user_id = %allocation.user_id(), "skipping allocation to unknown user");
                    return None;
                };
                Some(Self {
                    doable_id: doable.id().as_str(),
                    doable_title: doable.title(),
                    doable_type: doable.doable_type(),
                    case_id: doable.case_id().map(CaseId::as_str),
                    created_at: doable.created_at(),
                    priority: doable.priority(),
                    status: doable.status(),
                    user_id: user.id().as_str(),
                    user_name: user.user_name(),
                    user_first_name: user.first_name(),
                    user_last_name: user.last_name(),
                    user_preferred_type: user.preferred_doable_type(),
                    allocated_at: allocation.allocated_at(),
                    is_case_allocation: allocation.is_case_allocation(),
                })
            })
            .collect();

        rows.sort_by_key(|row| (row.priority.rank(), row.created_at));
        rows
    }
}
