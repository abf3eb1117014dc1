//! A filesystem backed workspace of doables, users and allocations.
//!
//! The [`Workspace`] loads the three collections from the JSON files named in
//! its [`Config`], exposes the in-memory stores, and writes the mutable
//! collections back with [`Workspace::flush`]. Nothing is written until then.

use std::path::{Path, PathBuf};

use tracing::instrument;

use crate::{
    domain::{
        Allocation, AllocationError, AllocationView, Allocations, Allocator, Config, ConfigError,
        Doable, DoablePatch, DoableStore, DoableStoreError, DuplicateUserError, NewDoable, Status,
        User, UserStore,
    },
    storage::{
        json::{self, LoadError, SaveError},
        records::{AllocationRecord, DoableRecord, UserRecord},
    },
};

/// Errors that can occur when opening a workspace.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    /// The configuration file is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A data file could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// The doables file contains duplicate ids.
    #[error("inconsistent doables: {0}")]
    Doables(#[from] DoableStoreError),
    /// The users file contains duplicate ids.
    #[error("inconsistent users: {0}")]
    Users(#[from] DuplicateUserError),
    /// The allocations file allocates a doable twice.
    #[error("inconsistent allocations: {0}")]
    Allocations(#[from] AllocationError),
}

/// Errors that can occur when initialising a workspace.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// The workspace directory could not be created.
    #[error("failed to create {}: {source}", path.display())]
    CreateDir {
        /// The workspace root.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },
    /// The configuration file could not be written.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A data file could not be written.
    #[error(transparent)]
    Save(#[from] SaveError),
}

/// A directory holding a configuration file and the three data files.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    config: Config,
    doables: DoableStore,
    users: UserStore,
    allocations: Allocations,
}

impl Workspace {
    /// Opens the workspace at `root`, loading every collection into memory.
    ///
    /// # Errors
    ///
    /// Fails if the configuration or a data file is malformed, if a record is
    /// invalid, or if a collection contains duplicates. A missing data file is
    /// an empty collection unless the configuration disallows it.
    #[instrument(level = "debug", skip_all, fields(root = %root.as_ref().display()))]
    pub fn open(root: impl AsRef<Path>) -> Result<Self, OpenError> {
        let root = root.as_ref().to_path_buf();
        let config = Config::load_or_default(&root)?;
        let allow_missing = config.allow_missing;

        let doables = json::load_as::<DoableRecord, Doable>(
            &root.join(&config.doables_file),
            allow_missing,
        )?;
        let users = json::load_as::<UserRecord, User>(&root.join(&config.users_file), allow_missing)?;
        let allocations = json::load_as::<AllocationRecord, Allocation>(
            &root.join(&config.allocations_file),
            allow_missing,
        )?;

        let workspace = Self {
            doables: DoableStore::from_doables(doables)?,
            users: UserStore::from_users(users)?,
            allocations: Allocations::from_allocations(allocations)?,
            root,
            config,
        };
        workspace.warn_dangling();
        Ok(workspace)
    }

    /// Creates a workspace at `root` with a default configuration and empty
    /// data files.
    ///
    /// Existing files are left untouched, so initialising an existing
    /// workspace is harmless.
    ///
    /// # Errors
    ///
    /// Fails if the directory or any of the files cannot be written.
    pub fn init(root: impl AsRef<Path>) -> Result<(), InitError> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|source| InitError::CreateDir {
            path: root.to_path_buf(),
            source,
        })?;

        let config_path = root.join(Config::FILE_NAME);
        let config = if config_path.exists() {
            Config::load(&config_path)?
        } else {
            let config = Config::default();
            config.save(&config_path)?;
            config
        };

        for file in [
            &config.users_file,
            &config.doables_file,
            &config.allocations_file,
        ] {
            let path = root.join(file);
            if !path.exists() {
                json::save::<serde_json::Value>(&path, &[])?;
            }
        }

        tracing::info!("Initialized workspace in {}", root.display());
        Ok(())
    }

    /// The doables.
    #[must_use]
    pub const fn doables(&self) -> &DoableStore {
        &self.doables
    }

    /// The users.
    #[must_use]
    pub const fn users(&self) -> &UserStore {
        &self.users
    }

    /// The active allocations.
    #[must_use]
    pub const fn allocations(&self) -> &Allocations {
        &self.allocations
    }

    /// Borrows the stores for allocation operations.
    pub const fn allocator(&mut self) -> Allocator<'_> {
        Allocator::new(&mut self.allocations, &mut self.doables, &self.users)
    }

    /// The joined view of every active allocation.
    #[must_use]
    pub fn allocation_view(&self) -> Vec<AllocationView<'_>> {
        AllocationView::build(&self.allocations, &self.doables, &self.users)
    }

    /// The doables allocated to a user that are not yet completed.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::UserNotFound`] for an unknown user.
    pub fn user_doables(&self, user_id: &str) -> Result<Vec<&Doable>, AllocationError> {
        if self.users.get(user_id).is_none() {
            return Err(AllocationError::UserNotFound(user_id.to_string()));
        }
        Ok(self
            .allocations
            .by_user(user_id)
            .into_iter()
            .filter_map(|allocation| self.doables.get(allocation.doable_id()))
            .filter(|doable| doable.status() != Status::Completed)
            .collect())
    }

    /// Creates a doable with a generated id.
    ///
    /// # Errors
    ///
    /// See [`DoableStore::create`].
    pub fn create_doable(&mut self, new: NewDoable) -> Result<&Doable, DoableStoreError> {
        self.doables.create(new)
    }

    /// Applies a partial update to a doable, keeping the allocations in step
    /// with its status.
    ///
    /// Moving an allocated doable back to `pending` releases its allocation.
    /// The whole update is validated before anything changes.
    ///
    /// # Errors
    ///
    /// Fails as [`DoableStore::update`] does, or with
    /// [`AllocationError::NotAllocated`] when asked to mark a doable
    /// `allocated` that has no allocation.
    pub fn update_doable(
        &mut self,
        id: &str,
        patch: &DoablePatch,
    ) -> Result<&Doable, AllocationError> {
        let doable_id = self
            .doables
            .get(id)
            .ok_or_else(|| DoableStoreError::NotFound(id.to_string()))?
            .apply(patch)
            .map_err(DoableStoreError::from)?
            .id()
            .clone();

        let allocated = self.allocations.contains(id);
        match patch.new_status() {
            Some(Status::Pending) if allocated => {
                self.allocator().release(id)?;
            }
            Some(Status::Allocated) if !allocated => {
                return Err(AllocationError::NotAllocated(doable_id));
            }
            _ => {}
        }

        Ok(self.doables.update(id, patch)?)
    }

    /// Writes the doables and allocations back to disk.
    ///
    /// Users are never modified, so the users file is not rewritten.
    ///
    /// # Errors
    ///
    /// Fails if either file cannot be written.
    #[instrument(level = "debug", skip(self))]
    pub fn flush(&self) -> Result<(), SaveError> {
        let doables: Vec<DoableRecord> = self.doables.iter().map(DoableRecord::from).collect();
        json::save(&self.root.join(&self.config.doables_file), &doables)?;

        let allocations: Vec<AllocationRecord> =
            self.allocations.iter().map(AllocationRecord::from).collect();
        json::save(&self.root.join(&self.config.allocations_file), &allocations)?;

        Ok(())
    }

    fn warn_dangling(&self) {
        for allocation in self.allocations.iter() {
            if self.doables.get(allocation.doable_id()).is_none() {
                tracing::warn!(
                    "Allocation refers to unknown doable {}",
                    allocation.doable_id()
                );
            }
            if self.users.get(allocation.user_id()).is_none() {
                tracing::warn!(
                    "Allocation of {} refers to unknown user {}",
                    allocation.doable_id(),
                    allocation.user_id()
                );
            }
        }
    }
}
