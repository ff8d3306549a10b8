use thiserror::Error;

/// Failures at the edges of the crate. Encounter and generation logic itself
/// never fails; these cover loading tunables and moving learned weights in
/// and out of the process.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
