use std::path::PathBuf;

use thiserror::Error;

/// Failure kinds specific to the mix pipeline.
///
/// I/O failures are not represented here; they propagate unchanged as
/// `anyhow` errors from the reader/writer layer.
#[derive(Debug, Error)]
pub enum MixError {
    /// An input header exposes fewer than the two required role columns.
    #[error("input {path:?} must have at least 2 columns, found {found}")]
    Schema { path: PathBuf, found: usize },
    /// A weight cell is not a number, with or without a trailing '%'.
    #[error("invalid weight '{raw}'")]
    Parse { raw: String },
    /// Mutually exclusive output options were combined, or the format
    /// template is not understood.
    #[error("{0}")]
    Config(String),
}
