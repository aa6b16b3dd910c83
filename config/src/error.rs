use std::path::PathBuf;

use thiserror::Error;

/// Failure to obtain a usable [`GameConfig`](crate::GameConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document could not be read.
    #[error("failed to read configuration at {}", path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The document is not valid TOML or does not match the expected shape.
    #[error("failed to parse configuration toml")]
    Parse(#[from] toml::de::Error),
    /// A value is outside the range the runtime accepts.
    #[error("invalid configuration value for `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending key.
        field: String,
        /// What the value must satisfy.
        reason: String,
    },
}
