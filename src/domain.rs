//! Domain models for work allocation.
//!
//! This module contains the core domain types (doables, users and
//! allocations), the in-memory stores that own them, the allocation engine and
//! the workspace configuration. Nothing in here touches the filesystem except
//! [`Config`].

/// A single allocation record.
pub mod allocation;
pub use allocation::Allocation;

/// The allocation engine.
pub mod allocations;
pub use allocations::{AllocationError, Allocations, Allocator};

mod config;
pub use config::{Config, ConfigError};

/// Doable domain model, enumerated fields and partial updates.
pub mod doable;
pub use doable::{Doable, DoablePatch, DoableType, PatchError, Priority, Status, ValidationError};

/// The in-memory doable store.
pub mod doables;
pub use doables::{CaseGroup, DoableStore, DoableStoreError, NewDoable};

mod error;
pub use error::ErrorKind;

/// Validated identifier types.
pub mod ids;
pub use ids::{CaseId, DoableId, EmptyIdError, UserId};

/// User domain model.
pub mod user;
pub use user::{MissingNameError, User};

/// The in-memory user store.
pub mod users;
pub use users::{DuplicateUserError, UserStore};

/// Denormalized read model of the active allocations.
pub mod view;
pub use view::AllocationView;
