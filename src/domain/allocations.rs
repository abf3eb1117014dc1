//! The allocation engine.
//!
//! [`Allocations`] is the collection of active allocations, keyed by doable.
//! It can only be changed through an [`Allocator`], which pairs every change
//! to the collection with the matching status transition in the
//! [`DoableStore`]:
//!
//! - allocating a doable moves it from `pending` to `allocated`
//! - releasing an allocation moves the doable back to `pending`

use std::collections::BTreeMap;

use tracing::instrument;

use crate::domain::{
    allocation::Allocation,
    doable::{Doable, DoableType, Status},
    doables::{CaseGroup, DoableStore, DoableStoreError},
    error::ErrorKind,
    ids::{DoableId, UserId},
    users::UserStore,
};

/// Errors raised by the allocation engine.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AllocationError {
    /// The requesting user does not exist.
    #[error("user {0} not found")]
    UserNotFound(String),
    /// The doable has no active allocation.
    #[error("no allocation found for doable with id {0}")]
    NotFound(String),
    /// The doable already has an active allocation.
    #[error("doable {0} is already allocated")]
    AlreadyAllocated(DoableId),
    /// The doable cannot be marked allocated without an allocation.
    #[error("doable {0} has no allocation; allocate it instead")]
    NotAllocated(DoableId),
    /// The doable store rejected a status transition.
    #[error(transparent)]
    Doables(#[from] DoableStoreError),
}

impl AllocationError {
    /// The broad category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_) | Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyAllocated(_) | Self::NotAllocated(_) => ErrorKind::Conflict,
            Self::Doables(e) => e.kind(),
        }
    }
}

/// The set of active allocations, at most one per doable.
#[derive(Debug, Clone, Default)]
pub struct Allocations {
    by_doable: BTreeMap<DoableId, Allocation>,
}

impl Allocations {
    /// Builds the collection from previously saved allocations.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::AlreadyAllocated`] if two allocations name
    /// the same doable.
    pub fn from_allocations(
        allocations: impl IntoIterator<Item = Allocation>,
    ) -> Result<Self, AllocationError> {
        let mut collection = Self::default();
        for allocation in allocations {
            collection.insert(allocation)?;
        }
        tracing::debug!(count = collection.len(), "loaded allocations");
        Ok(collection)
    }

    /// The active allocation for a doable, if any.
    #[must_use]
    pub fn get(&self, doable_id: &str) -> Option<&Allocation> {
        self.by_doable.get(doable_id)
    }

    /// Whether the doable has an active allocation.
    #[must_use]
    pub fn contains(&self, doable_id: &str) -> bool {
        self.by_doable.contains_key(doable_id)
    }

    /// Iterates over every allocation, ordered by doable id.
    pub fn iter(&self) -> impl Iterator<Item = &Allocation> {
        self.by_doable.values()
    }

    /// Every allocation held by the given user.
    #[must_use]
    pub fn by_user(&self, user_id: &str) -> Vec<&Allocation> {
        self.iter()
            .filter(|a| a.user_id().as_str() == user_id)
            .collect()
    }

    /// The number of active allocations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_doable.len()
    }

    /// Whether there are no active allocations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_doable.is_empty()
    }

    fn insert(&mut self, allocation: Allocation) -> Result<(), AllocationError> {
        if self.contains(allocation.doable_id()) {
            return Err(AllocationError::AlreadyAllocated(
                allocation.doable_id().clone(),
            ));
        }
        self.by_doable
            .insert(allocation.doable_id().clone(), allocation);
        Ok(())
    }

    fn remove(&mut self, doable_id: &str) -> Option<Allocation> {
        self.by_doable.remove(doable_id)
    }
}

/// Hands doables out to users.
///
/// An `Allocator` is a short-lived borrow of the three stores. It is the only
/// writer of [`Allocations`], and changes doables only through
/// [`DoableStore::set_status`].
#[derive(Debug)]
pub struct Allocator<'a> {
    allocations: &'a mut Allocations,
    doables: &'a mut DoableStore,
    users: &'a UserStore,
}

impl<'a> Allocator<'a> {
    /// Borrows the stores for a sequence of allocation operations.
    pub const fn new(
        allocations: &'a mut Allocations,
        doables: &'a mut DoableStore,
        users: &'a UserStore,
    ) -> Self {
        Self {
            allocations,
            doables,
            users,
        }
    }

    /// Allocates the next pending doable to a user.
    ///
    /// The doable is the first in queue order (pending, highest priority,
    /// oldest), restricted to `doable_type` when given. A pending doable that
    /// still holds an allocation is passed over. Returns `None` if nothing is
    /// waiting.
    ///
    /// # Errors
    ///
    /// Fails if the user does not exist.
    #[instrument(level = "debug", skip(self))]
    pub fn allocate_single(
        &mut self,
        user_id: &str,
        doable_type: Option<DoableType>,
    ) -> Result<Option<Allocation>, AllocationError> {
        let user_id = self.user(user_id)?;

        let allocations = &*self.allocations;
        let Some(doable) = self
            .doables
            .next_pending(doable_type, |d| allocations.contains(d.id()))
        else {
            tracing::debug!("no pending doable to allocate");
            return Ok(None);
        };
        let doable_id = doable.id().clone();

        self.ensure_unallocated([&doable_id])?;
        self.commit(doable_id, user_id, false).map(Some)
    }

    /// Allocates every doable of one case to a user.
    ///
    /// Only cases in which every doable is still pending, and none holds an
    /// allocation, are considered. With a `doable_type`, the first such case
    /// containing a doable of that type is chosen; otherwise, or if no case
    /// contains that type, the case whose oldest doable is oldest. Returns an
    /// empty list if no case qualifies.
    ///
    /// # Errors
    ///
    /// Fails if the user does not exist. Nothing is allocated in that case.
    #[instrument(level = "debug", skip(self))]
    pub fn allocate_case(
        &mut self,
        user_id: &str,
        doable_type: Option<DoableType>,
    ) -> Result<Vec<Allocation>, AllocationError> {
        let user_id = self.user(user_id)?;

        let Some(doable_ids) = self.select_case(doable_type) else {
            tracing::debug!("no eligible case to allocate");
            return Ok(Vec::new());
        };

        self.ensure_unallocated(&doable_ids)?;
        doable_ids
            .into_iter()
            .map(|doable_id| self.commit(doable_id, user_id.clone(), true))
            .collect()
    }

    fn select_case(&self, doable_type: Option<DoableType>) -> Option<Vec<DoableId>> {
        let eligible: Vec<CaseGroup<'_>> = self
            .doables
            .grouped_by_case()
            .into_iter()
            .filter(CaseGroup::is_all_pending)
            .filter(|g| !g.doables.iter().any(|d| self.allocations.contains(d.id())))
            .collect();

        let preferred = doable_type.and_then(|t| eligible.iter().find(|g| g.contains_type(t)));

        // min_by_key keeps the first of equal keys, i.e. store order
        let chosen = preferred.or_else(|| eligible.iter().min_by_key(|g| g.oldest_created_at()))?;

        tracing::debug!(case_id = %chosen.case_id, "selected case");
        Some(chosen.doables.iter().map(|d| d.id().clone()).collect())
    }

    /// Allocates the pending doables of a specific case to a user.
    ///
    /// Doables in the case that are already allocated or completed, or that
    /// still hold an allocation, are left alone. The new allocations are not
    /// marked as case allocations, since the case as a whole may be split
    /// between users. Returns only the allocations made, which may be none.
    ///
    /// # Errors
    ///
    /// Fails if the user does not exist.
    #[instrument(level = "debug", skip(self))]
    pub fn allocate_related(
        &mut self,
        user_id: &str,
        case_id: &str,
    ) -> Result<Vec<Allocation>, AllocationError> {
        let user_id = self.user(user_id)?;

        let doable_ids: Vec<DoableId> = self
            .doables
            .by_case(case_id)
            .into_iter()
            .filter(|d| d.status().is_pending() && !self.allocations.contains(d.id()))
            .map(|d| d.id().clone())
            .collect();

        self.ensure_unallocated(&doable_ids)?;
        doable_ids
            .into_iter()
            .map(|doable_id| self.commit(doable_id, user_id.clone(), false))
            .collect()
    }

    /// Removes the allocation of a doable and returns the doable to the
    /// queue.
    ///
    /// A completed doable keeps its status; only the allocation goes.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::NotFound`] if the doable has no allocation.
    #[instrument(level = "debug", skip(self))]
    pub fn release(&mut self, doable_id: &str) -> Result<Allocation, AllocationError> {
        if !self.allocations.contains(doable_id) {
            return Err(AllocationError::NotFound(doable_id.to_string()));
        }
        self.revoke(doable_id)
    }

    /// Removes the allocations of every doable in a case.
    ///
    /// This is all or nothing: every doable in the case must be allocated and
    /// hold an allocation, and this is checked before anything is removed.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::NotFound`] naming the first doable in the
    /// case that has no allocation or is not in the `allocated` state. No
    /// allocation is removed in that case.
    #[instrument(level = "debug", skip(self))]
    pub fn release_case(&mut self, case_id: &str) -> Result<Vec<Allocation>, AllocationError> {
        let doable_ids: Vec<DoableId> = self
            .doables
            .by_case(case_id)
            .into_iter()
            .map(|d| d.id().clone())
            .collect();

        if let Some(missing) = doable_ids.iter().find(|id| {
            !self.allocations.contains(id)
                || self
                    .doables
                    .get(id)
                    .is_none_or(|d| d.status() != Status::Allocated)
        }) {
            return Err(AllocationError::NotFound(missing.to_string()));
        }

        doable_ids
            .iter()
            .map(|doable_id| self.revoke(doable_id))
            .collect()
    }

    fn user(&self, user_id: &str) -> Result<UserId, AllocationError> {
        self.users
            .get(user_id)
            .map(|user| user.id().clone())
            .ok_or_else(|| AllocationError::UserNotFound(user_id.to_string()))
    }

    fn ensure_unallocated<'i>(
        &self,
        doable_ids: impl IntoIterator<Item = &'i DoableId>,
    ) -> Result<(), AllocationError> {
        doable_ids
            .into_iter()
            .find(|id| self.allocations.contains(id))
            .map_or(Ok(()), |id| Err(AllocationError::AlreadyAllocated(id.clone())))
    }

    fn commit(
        &mut self,
        doable_id: DoableId,
        user_id: UserId,
        is_case_allocation: bool,
    ) -> Result<Allocation, AllocationError> {
        self.doables.set_status(&doable_id, Status::Allocated)?;

        let allocation =
            Allocation::new(doable_id, user_id).with_case_allocation(is_case_allocation);
        self.allocations.insert(allocation.clone())?;

        tracing::info!(
            "Allocated {} to {}",
            allocation.doable_id(),
            allocation.user_id()
        );
        Ok(allocation)
    }

    fn revoke(&mut self, doable_id: &str) -> Result<Allocation, AllocationError> {
        let allocation = self
            .allocations
            .remove(doable_id)
            .ok_or_else(|| AllocationError::NotFound(doable_id.to_string()))?;

        match self.doables.get(doable_id).map(Doable::status) {
            Some(Status::Allocated) => {
                self.doables.set_status(doable_id, Status::Pending)?;
            }
            Some(status) => {
                tracing::debug!(%status, "released allocation of {doable_id} without a status change");
            }
            None => tracing::warn!("Released allocation for unknown doable {doable_id}"),
        }

        tracing::info!(
            "Released {} from {}",
            allocation.doable_id(),
            allocation.user_id()
        );
        Ok(allocation)
    }
}
