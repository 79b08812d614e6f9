use thiserror::Error;

use crate::entry::Entry;

pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the remapping core.
///
/// `ClassNotFound` and `MalformedClass` are deliberately distinct: callers
/// must be able to tell "this class is not in the jar" apart from "the bytes
/// are there but unparsable". Variants are cloneable so a cached load failure
/// can be replayed to every waiter of a single-flight cell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("class not found: {0}")]
    ClassNotFound(String),

    #[error("malformed class {name}: {reason}")]
    MalformedClass { name: String, reason: String },

    #[error("name `{name}` already taken by {taken_by}")]
    NameConflict { name: String, taken_by: Entry },

    #[error("`{0}` is not a legal identifier here")]
    InvalidName(String),

    #[error("unreadable mapping snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("i/o error on {path}: {message}")]
    Io { path: String, message: String },
}

impl Error {
    pub fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedClass {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
