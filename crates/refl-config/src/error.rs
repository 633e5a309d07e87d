use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A provider could not be read or a value has the wrong type.
    #[error("failed to load configuration: {0}")]
    Figment(#[from] figment::Error),

    /// A value parsed but is out of range (e.g. a non-positive threshold).
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
