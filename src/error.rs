use thiserror::Error;

/// Everything the core filesystem can fail with.
///
/// CLI front-ends wrap these in `anyhow::Context` to attach the path or
/// filename they were operating on; the library itself never formats a
/// path into the message, it only carries the raw data.
#[derive(Debug, Error)]
pub enum VfsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad image: {0}")]
    BadImage(String),

    #[error("invalid geometry: {0}")]
    Geometry(String),

    #[error("already exists: {0}")]
    Exists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not a regular file: {0}")]
    NotFile(String),

    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("no space left ({0})")]
    NoSpace(&'static str),

    #[error("write of {requested} bytes at offset {offset} exceeds maximum file size of {max}")]
    TooLarge {
        requested: u64,
        offset: u64,
        max: u64,
    },

    #[error("invalid operation: {0}")]
    Invalid(String),

    #[error("corrupt filesystem: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, VfsError>;
