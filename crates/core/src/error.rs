use std::path::PathBuf;

use crate::assets::SoundEffect;

/// Result alias that carries the custom [`DemoError`] type.
pub type Result<T> = std::result::Result<T, DemoError>;

/// Common error type for the core crate.
///
/// None of these are produced by the playback controller itself; they all
/// belong to startup (decoding, device open, configuration) and are fatal to
/// the binary.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The audio output device could not be opened or driven.
    #[error("audio device: {0}")]
    Audio(String),
    /// A sound asset could not be decoded into the process audio format.
    #[error("failed to decode `{}`: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    /// The sample store has nothing registered for an effect.
    #[error("no sample loaded for {0:?}")]
    MissingAsset(SoundEffect),
    /// A configuration or script file was malformed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}

impl DemoError {
    pub(crate) fn audio(err: impl std::fmt::Display) -> Self {
        Self::Audio(err.to_string())
    }
}
