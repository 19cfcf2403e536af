//! Error types for the discovery facade and its controllers.

use std::io;
use std::net::IpAddr;
use thiserror::Error;

/// Result alias for facade and address operations
pub type Result<T> = std::result::Result<T, NatError>;

/// Errors raised synchronously by facade and address operations
#[derive(Debug, Error)]
pub enum NatError {
    /// Argument rejected before any side effect took place
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Parameter name
        name: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Local host name lookup or resolution failed
    #[error("failed to resolve local host {host:?}: {source}")]
    Resolution {
        /// Host name being resolved (empty when the name itself was unavailable)
        host: String,
        /// Underlying resolver error
        #[source]
        source: io::Error,
    },

    /// Address family not covered by the classifier
    #[error("unsupported address family for {0}")]
    UnsupportedAddressFamily(IpAddr),
}

/// Errors a controller reports from its start/stop routines
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Socket or other I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Start requested while discovery is already running
    #[error("discovery already running")]
    AlreadyRunning,

    /// Stop requested while discovery is not running
    #[error("discovery not running")]
    NotRunning,

    /// Controller-specific failure
    #[error("{0}")]
    Other(String),
}
