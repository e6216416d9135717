use thiserror::Error;

pub mod uri;

pub use uri::{SipScheme, SipUri};

/// Unified error type for the softphone.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid SIP URI: {0}")]
    InvalidUri(String),
}
