use std::path::PathBuf;

/// Everything that can abort a conversion pass.
///
/// All variants are fatal: the pass is deterministic and one-shot, so nothing
/// produced before the error should be treated as valid output.
#[derive(thiserror::Error, Debug)]
pub enum AnimError {
    /// Bad input parameters or a malformed channel configuration entry.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// MIDI files we refuse to convert (format 2, SMPTE timing).
    #[error("unsupported MIDI file: {0}")]
    UnsupportedFormat(String),
    /// Discovery and dispatch disagree about a channel or note.
    #[error("data inconsistency: {0}")]
    DataInconsistency(String),
    #[error("MIDI decode failed: {0}")]
    Midi(#[from] midly::Error),
    #[error("{path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, AnimError>;

impl AnimError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
