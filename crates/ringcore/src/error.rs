//! Error taxonomy for the ring and the workqueue.
//!
//! Negative-POSIX-style return codes in the source material become two
//! small enums here, one per subsystem, each carrying only the kinds
//! that subsystem can actually return to a caller (see §7 of the
//! design: `QueueFull` never escapes the workqueue — the producer
//! blocks on it internally instead).

use std::fmt;

/// Errors returned by the ring's public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    /// Opcode value outside the closed set, or a malformed payload.
    InvalidArgument,
    /// Allocation failure for buffers or task envelopes.
    OutOfMemory,
    /// The ring has been stopped or is stopping.
    OwnerDead,
    /// An opcode the dispatcher does not recognize.
    Unsupported,
}

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingError::InvalidArgument => write!(f, "invalid argument"),
            RingError::OutOfMemory => write!(f, "out of memory"),
            RingError::OwnerDead => write!(f, "ring is stopped or stopping"),
            RingError::Unsupported => write!(f, "unsupported opcode"),
        }
    }
}

impl std::error::Error for RingError {}

/// Errors returned by the workqueue's public API.
///
/// `QueueFull` is deliberately absent: per the contract, a full queue
/// blocks the caller rather than returning an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkQueueError {
    /// Malformed `WorkQueueAttr` (unknown flag, `min_threads > max_threads`).
    InvalidArgument,
    /// Allocation or thread-spawn failure.
    OutOfMemory,
    /// The workqueue has been stopped or is stopping.
    OwnerDead,
}

impl fmt::Display for WorkQueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkQueueError::InvalidArgument => write!(f, "invalid workqueue attributes"),
            WorkQueueError::OutOfMemory => write!(f, "failed to allocate worker or buffer"),
            WorkQueueError::OwnerDead => write!(f, "workqueue is stopped or stopping"),
        }
    }
}

impl std::error::Error for WorkQueueError {}

pub type RingResult<T> = std::result::Result<T, RingError>;
pub type WorkQueueResult<T> = std::result::Result<T, WorkQueueError>;
