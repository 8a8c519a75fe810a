//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    /// Request-shape problems surfaced to the caller as 4xx.
    #[error("{0}")]
    BadRequest(String),

    /// Approach name not present in the registry for the requested kind.
    #[error("unknown approach")]
    UnknownApproach,

    /// Missing object or missing content-type metadata on the content path.
    #[error("not found")]
    NotFound,

    /// Stored file too large to proxy inline.
    #[error("file is {size} bytes, over the preview limit")]
    Oversize { size: u64 },

    /// Any failure from a downstream service call (token refresh, search,
    /// completion, storage, usage-log write). Never retried at this layer.
    #[error("{0}")]
    Upstream(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
