//! Concrete `WorkQueue` and `Ring` built on `std::sync::{Mutex, Condvar}`.
//!
//! See `workqueue` for the bounded work buffer and worker pool, and
//! `ring` for the SQ/CQ pair built on top of it.

pub mod ring;
pub mod workqueue;

pub use ring::{errno, Ring};
pub use workqueue::{WorkQueue, WorkQueueAttr, LAZY_THREAD_CREATION};
