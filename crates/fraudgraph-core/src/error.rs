use thiserror::Error;

/// Errors shared across the fraudgraph crates.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A threshold, window, or cut point is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config source error: {0}")]
    ConfigSource(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
