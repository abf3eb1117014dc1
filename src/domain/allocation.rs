use chrono::{DateTime, Utc};

use crate::domain::ids::{DoableId, UserId};

/// A binding of one doable to one user.
///
/// Both identifiers are non-empty by construction. An allocation is keyed by
/// its doable: a doable has at most one allocation at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    doable_id: DoableId,
    user_id: UserId,
    allocated_at: DateTime<Utc>,
    is_case_allocation: bool,
}

impl Allocation {
    /// Allocates `doable_id` to `user_id` as of now.
    #[must_use]
    pub fn new(doable_id: DoableId, user_id: UserId) -> Self {
        Self {
            doable_id,
            user_id,
            allocated_at: Utc::now(),
            is_case_allocation: false,
        }
    }

    /// Marks whether this allocation was made as part of a whole-case
    /// allocation.
    #[must_use]
    pub const fn with_case_allocation(mut self, is_case_allocation: bool) -> Self {
        self.is_case_allocation = is_case_allocation;
        self
    }

    /// Overrides the allocation timestamp, e.g. when loading from storage.
    #[must_use]
    pub const fn with_allocated_at(mut self, allocated_at: DateTime<Utc>) -> Self {
        self.allocated_at = allocated_at;
        self
    }

    /// The allocated doable.
    #[must_use]
    pub const fn doable_id(&self) -> &DoableId {
        &self.doable_id
    }

    /// The user the doable is allocated to.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// When the allocation was made.
    #[must_use]
    pub const fn allocated_at(&self) -> DateTime<Utc> {
        self.allocated_at
    }

    /// Whether the allocation was made as part of a whole-case allocation.
    #[must_use]
    pub const fn is_case_allocation(&self) -> bool {
        self.is_case_allocation
    }
}
