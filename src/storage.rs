pub mod json;
/// On-disk record formats.
pub mod records;
pub mod workspace;

pub use json::{LoadError, SaveError};
pub use records::RecordError;
pub use workspace::{InitError, OpenError, Workspace};
