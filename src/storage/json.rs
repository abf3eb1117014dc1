//! Reading and writing whole collections as JSON arrays.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};

use crate::storage::records::RecordError;

/// Errors that can occur when loading a data file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file does not exist and missing files are not allowed.
    #[error("data file {} not found", .0.display())]
    NotFound(PathBuf),
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The data file.
        path: PathBuf,
        /// The underlying IO error.
        source: io::Error,
    },
    /// The file is not a JSON array of the expected records.
    #[error("failed to parse {}: {source}", path.display())]
    Json {
        /// The data file.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
    /// A record was well-formed JSON but not a valid value.
    #[error("invalid record in {}: {source}", path.display())]
    Record {
        /// The data file.
        path: PathBuf,
        /// Why the record was rejected.
        source: RecordError,
    },
}

/// Errors that can occur when writing a data file.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// The file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// The data file.
        path: PathBuf,
        /// The underlying IO error.
        source: io::Error,
    },
    /// The records could not be serialized.
    #[error("failed to serialize {}: {source}", path.display())]
    Json {
        /// The data file.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// Reads a JSON array of records from `path`.
///
/// Returns `None` if the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>, LoadError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(LoadError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_reader(BufReader::new(file))
        .map(Some)
        .map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Reads a JSON array of records from `path` and converts each into a domain
/// value.
///
/// A missing file is an empty collection if `allow_missing` is set, and an
/// error otherwise.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded, or if any record fails to
/// convert.
pub fn load_as<R, T>(path: &Path, allow_missing: bool) -> Result<Vec<T>, LoadError>
where
    R: DeserializeOwned,
    T: TryFrom<R, Error = RecordError>,
{
    let Some(records) = load::<R>(path)? else {
        if allow_missing {
            tracing::debug!("{} not found, starting empty", path.display());
            return Ok(Vec::new());
        }
        return Err(LoadError::NotFound(path.to_path_buf()));
    };

    records
        .into_iter()
        .map(T::try_from)
        .collect::<Result<_, _>>()
        .map_err(|source| LoadError::Record {
            path: path.to_path_buf(),
            source,
        })
}

/// Overwrites `path` with a pretty-printed JSON array of `records`.
///
/// Missing parent directories are created.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save<T: Serialize>(path: &Path, records: &[T]) -> Result<(), SaveError> {
    let io_error = |source: io::Error| SaveError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }

    let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
    serde_json::to_writer_pretty(&mut writer, records).map_err(|source| SaveError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.write_all(b"\n").map_err(io_error)?;
    writer.flush().map_err(io_error)?;

    tracing::debug!(count = records.len(), "wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{domain::Allocation, storage::records::AllocationRecord};

    #[test]
    fn missing_file_is_none() {
        let tmp = TempDir::new().unwrap();
        let loaded = load::<serde_json::Value>(&tmp.path().join("nope.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn missing_file_is_an_error_when_not_allowed() {
        let tmp = TempDir::new().unwrap();
        let result = load_as::<AllocationRecord, Allocation>(&tmp.path().join("nope.json"), false);
        assert!(matches!(result, Err(LoadError::NotFound(_))));
    }

    #[test]
    fn malformed_file_names_the_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("allocations.json");
        std::fs::write(&path, "{ not json").unwrap();

        let error = load_as::<AllocationRecord, Allocation>(&path, true).unwrap_err();

        assert!(matches!(error, LoadError::Json { .. }));
        assert!(error.to_string().contains("allocations.json"));
    }

    #[test]
    fn invalid_record_fails_the_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("allocations.json");
        std::fs::write(
            &path,
            r#"[{"doable_id": "", "user_id": "u1", "allocated_at": "2024-01-01T00:00:00"}]"#,
        )
        .unwrap();

        let error = load_as::<AllocationRecord, Allocation>(&path, true).unwrap_err();

        assert!(matches!(error, LoadError::Record { .. }));
    }

    #[test]
    fn save_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data").join("values.json");

        save(&path, &[1, 2, 3]).unwrap();

        let loaded = load::<u32>(&path).unwrap().unwrap();
        assert_eq!(loaded, [1, 2, 3]);
    }
}
