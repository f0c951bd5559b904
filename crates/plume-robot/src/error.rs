//! Error types for the robot link, command channel and session.

use std::io;

/// Failures of the real-time register link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Socket error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The controller closed the connection during a request.
    #[error("connection closed by the controller")]
    Closed,

    /// The controller refused the requested protocol version.
    #[error("controller rejected protocol version {0}")]
    VersionRejected(u16),

    /// The controller refused to start or pause synchronization.
    #[error("controller refused the '{0}' request")]
    Refused(char),

    /// A recipe names a register the controller does not know.
    #[error("unknown register '{0}'")]
    UnknownVariable(String),

    /// A recipe names an input register another client already writes.
    #[error("register '{0}' is already in use by another client")]
    VariableInUse(String),

    /// A register has a different type than the recipe needs.
    #[error("register '{name}' has type {actual}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: String,
    },

    /// A package did not match the wire format.
    #[error("malformed package: {0}")]
    Protocol(String),

    /// A package is larger than the 16-bit size field allows.
    #[error("package of {0} bytes exceeds the frame size limit")]
    FrameTooLarge(usize),
}

/// Failures of the line-based command channel.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Socket error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The robot closed the connection before answering.
    #[error("command channel closed")]
    Closed,

    /// The robot answered with something other than the expected reply.
    #[error("'{command}' rejected: {response}")]
    Rejected { command: String, response: String },
}

/// Failures of a streaming run.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The register link failed.
    #[error("register link: {0}")]
    Link(#[from] LinkError),

    /// The robot stopped sending state before the trajectory was drained.
    #[error("connection lost after {waypoints_sent} waypoints")]
    ConnectionLost { waypoints_sent: usize },

    /// The run was cancelled from another thread.
    #[error("streaming cancelled")]
    Cancelled,

    /// The streaming thread could not be started.
    #[error("failed to spawn streaming thread: {0}")]
    Spawn(io::Error),

    /// The streaming thread panicked.
    #[error("streaming thread panicked")]
    Panicked,
}

/// Failures of a full drawing session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("command channel: {0}")]
    Command(#[from] CommandError),
}
