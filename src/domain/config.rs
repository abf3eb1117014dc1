use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Error raised when reading or writing the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        /// The config file.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },
    /// The file is not a valid configuration.
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        /// The config file.
        path: PathBuf,
        /// The underlying TOML error.
        source: toml::de::Error,
    },
    /// The configuration could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// The file could not be written.
    #[error("failed to write config file {}: {source}", path.display())]
    Write {
        /// The config file.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },
}

/// Configuration for a workspace.
///
/// Controls where the data files live, relative to the workspace root, and
/// how strictly they are loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// The file holding the users.
    pub users_file: PathBuf,

    /// The file holding the doables.
    pub doables_file: PathBuf,

    /// The file holding the active allocations.
    pub allocations_file: PathBuf,

    /// Whether a missing data file is read as an empty collection.
    ///
    /// When `false`, every data file must exist.
    pub allow_missing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            users_file: default_users_file(),
            doables_file: default_doables_file(),
            allocations_file: default_allocations_file(),
            allow_missing: true,
        }
    }
}

impl Config {
    /// The name of the configuration file within a workspace.
    pub const FILE_NAME: &str = "config.toml";

    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the configuration of the workspace at `root`, or the default
    /// configuration if the workspace has no config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed.
    pub fn load_or_default(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(Self::FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            tracing::debug!("no config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn default_users_file() -> PathBuf {
    PathBuf::from("users.json")
}

fn default_doables_file() -> PathBuf {
    PathBuf::from("doables.json")
}

fn default_allocations_file() -> PathBuf {
    PathBuf::from("allocations.json")
}

const fn default_allow_missing() -> bool {
    true
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_users_file")]
        users_file: PathBuf,

        #[serde(default = "default_doables_file")]
        doables_file: PathBuf,

        #[serde(default = "default_allocations_file")]
        allocations_file: PathBuf,

        #[serde(default = "default_allow_missing")]
        allow_missing: bool,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                users_file,
                doables_file,
                allocations_file,
                allow_missing,
            } => Self {
                users_file,
                doables_file,
                allocations_file,
                allow_missing,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            users_file: config.users_file,
            doables_file: config.doables_file,
            allocations_file: config.allocations_file,
            allow_missing: config.allow_missing,
        }
    }
}
