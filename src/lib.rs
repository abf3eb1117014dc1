//! Work-item allocation over plain JSON files.
//!
//! Doables (tasks and emails, optionally grouped into cases) are handed out to
//! users by an allocation engine that honours type preference, priority and
//! age. The data lives in a workspace directory of JSON files.

pub mod domain;
pub use domain::{
    Allocation, AllocationError, AllocationView, Allocations, Allocator, Config, Doable,
    DoableStore, DoableType, ErrorKind, Priority, Status, User, UserStore,
};

/// Filesystem storage of the workspace data files.
pub mod storage;
pub use storage::Workspace;
