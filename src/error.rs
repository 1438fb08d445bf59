use std::io;

/// Errors that abort an emission run
///
/// An interrupt is not an error; it ends the run normally and is recorded in
/// [`crate::summary::EmitSummary::interrupted`].
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("invalid emission plan: {0}")]
    InvalidPlan(String),

    #[error("could not resolve {addr}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to bind local UDP socket: {0}")]
    Bind(#[source] io::Error),

    #[error("failed to send packet {sequence}: {source}")]
    Send {
        sequence: u64,
        #[source]
        source: io::Error,
    },

    #[error("failed to read from stdin: {0}")]
    Prompt(#[source] io::Error),
}

/// Errors loading or validating the config file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("IO error reading config: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
