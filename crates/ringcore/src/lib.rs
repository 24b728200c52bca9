//! Data model for the ring/workqueue execution substrate.
//!
//! This crate defines the shapes that cross the boundary between a
//! producer (arming an operation), the ring (dispatching it inline or
//! to the workqueue), and a worker (running it and posting a
//! completion). It owns no threads and performs no I/O — see
//! `ringqueue` for the concrete `Ring` and `WorkQueue` that hold this
//! data in motion.
//!
//! Program to the interface: opcodes are a closed enum so dispatch is
//! exhaustive, and the task-envelope contract is a trait so "release
//! on discard" is a type-level property rather than a convention two
//! raw function pointers have to uphold by agreement.

pub mod envelope;
pub mod error;
pub mod opcode;

pub use envelope::{Envelope, TaskEnvelope};
pub use error::{RingError, RingResult, WorkQueueError, WorkQueueResult};
pub use opcode::{Cqe, Opcode, Sqe, SqePayload, WorkqueueOp};
