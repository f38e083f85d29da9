//! Error taxonomy shared by the placer adapter, the profile store and the controller.

use std::path::PathBuf;

/// Errors surfaced by layout capture, apply and profile persistence.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// The display placer executable is not present in any known location.
    #[error("displayplacer tool not found")]
    ToolNotFound,

    /// The tool ran but reported failure; the text is the tool's own diagnostic.
    #[error("displayplacer failed: {0}")]
    RunFailed(String),

    /// The tool output did not contain the expected layout line or arguments.
    #[error("could not parse current layout from displayplacer output")]
    ParseFailed,

    #[error("failed to persist profiles at {}: {source}", path.display())]
    PersistenceFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no layout profile matches '{0}'")]
    ProfileNotFound(String),

    /// A profile must carry at least one per-display argument.
    #[error("a layout profile needs at least one display argument")]
    EmptyArgs,
}

pub type LayoutResult<T> = Result<T, LayoutError>;

impl LayoutError {
    pub fn persistence(path: impl Into<PathBuf>, source: impl Into<std::io::Error>) -> Self {
        Self::PersistenceFailed {
            path: path.into(),
            source: source.into(),
        }
    }
}
