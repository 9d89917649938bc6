use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::destination::Destination;
use crate::transport::is_transient;

#[derive(Error, Debug)]
pub enum QueryError {
    /// A destination did not have a usable address/port shape.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The datagram matched none of the known response discriminators.
    #[error("bad response from {peer}")]
    MalformedResponse { peer: Destination },
    #[error("failed to bind local port: {0}")]
    FailedPortBind(io::Error),
    /// Shared so the same failure can be emitted and returned.
    #[error("failed to send datagram: {0}")]
    SendError(Arc<io::Error>),
    #[error("failed to receive datagram: {0}")]
    ReceiveError(Arc<io::Error>),
}

impl QueryError {
    /// Whether this error came from the underlying socket rather than from
    /// the caller or the remote host.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            QueryError::FailedPortBind(_) | QueryError::SendError(_) | QueryError::ReceiveError(_)
        )
    }

    /// Whether the socket is still usable after this error.
    pub fn is_transient(&self) -> bool {
        match self {
            QueryError::SendError(e) | QueryError::ReceiveError(e) => is_transient(e.kind()),
            _ => false,
        }
    }
}
