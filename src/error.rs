use std::path::PathBuf;

/// Fatal failures of a generation run. Any of these aborts the batch; nothing
/// is handed to an emitter afterwards.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A `$ref` pointer could not be followed inside its schema document.
    #[error("cannot resolve schema reference `{pointer}`: {reason}")]
    SchemaResolution { pointer: String, reason: String },

    /// The same descriptor was assembled twice against one resolution context.
    #[error("descriptor `{descriptor}` was already assembled in this resolution context")]
    InvalidReuse { descriptor: String },

    /// The descriptor has no shape that can be assembled.
    #[error("descriptor `{descriptor}` cannot be assembled: {reason}")]
    Unsupported { descriptor: String, reason: String },

    /// The catalogue is not a JSON array of descriptor records.
    #[error("malformed catalogue at JSON path {path}: {message}")]
    Decode { path: String, message: String },

    #[error("i/o failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn unresolved(pointer: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::SchemaResolution { pointer: pointer.into(), reason: reason.into() }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
