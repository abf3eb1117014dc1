/// Broad category of a domain failure.
///
/// Store and engine errors report one of these through their `kind` method so
/// that an outer layer can react to a failure without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input: a bad enum value, a missing required field, a task
    /// without a case.
    Validation,
    /// The operation referenced something that does not exist.
    NotFound,
    /// The operation would create a duplicate.
    Conflict,
    /// An update named a field the entity does not have.
    UnrecognisedField,
}
