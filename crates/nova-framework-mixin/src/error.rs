use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, MixinError>;

/// Errors produced while building a [`crate::MixinWorkspace`].
///
/// Queries against a built workspace never fail; they degrade to empty results.
#[derive(Debug, thiserror::Error)]
pub enum MixinError {
    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
