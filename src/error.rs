use std::io;

/// Failure to bring a frame source up.
///
/// Surfaced synchronously from `start()`; the source is left stopped and can be
/// retried with a different configuration.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("could not bind telemetry socket {addr}: {reason}")]
    Bind { addr: String, reason: io::Error },
    #[error("could not spawn telemetry receiver: {reason}")]
    Spawn { reason: io::Error },
}

/// A single datagram that could not be read as a telemetry frame.
#[derive(Debug, thiserror::Error)]
#[error("malformed telemetry datagram: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// The receive loop stopped on a socket error. The last good frame stays published.
#[derive(Debug, thiserror::Error)]
#[error("telemetry receiver terminated: {0}")]
pub struct SourceTerminated(#[from] io::Error);

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("telemetry channel must be stopped before it is reconfigured")]
    Running,
}
