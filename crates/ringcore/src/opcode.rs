//! Opcodes, SQE and CQE shapes.
//!
//! The source models an SQE as a fixed struct with a raw `op` byte and
//! a payload union tagged by that byte. Here the tag and the payload
//! are the same value: `SqePayload` is a discriminated union (a Rust
//! enum) so an SQE with, say, `op = MODULE_HANDLE` and a `Nop` payload
//! is simply impossible to construct.

use std::fmt;

/// The closed set of operations the ring understands.
///
/// Adding support for a new kind of work means adding a variant here
/// and a matching `SqePayload` arm and dispatch arm — not threading a
/// new raw opcode constant through an open-coded callback table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Dispatched inline; always completes with `res = 0`.
    Nop,
    /// Dispatched to the workqueue; `res` is the call's return code.
    ApiCall,
    /// Dispatched to the workqueue; `res` is the handler's return code.
    ModuleHandle,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Opcode::Nop => "NOP",
            Opcode::ApiCall => "API_CALL",
            Opcode::ModuleHandle => "MODULE_HANDLE",
        };
        f.write_str(s)
    }
}

/// A unit of work dispatched through the workqueue.
///
/// This is the "opaque work callback" the source passes as a
/// `(func, arg)` pair: here it is a single `FnOnce` closure that
/// captures whatever resource it needs and returns the value that
/// becomes the CQE's `res`. Dropping an unrun `WorkqueueOp` releases
/// everything it captured — this is what makes the task envelope's
/// discard guarantee (every payload resource is released exactly
/// once) hold without a separate deleter function pointer.
pub struct WorkqueueOp(Box<dyn FnOnce() -> i64 + Send>);

impl WorkqueueOp {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> i64 + Send + 'static,
    {
        WorkqueueOp(Box::new(f))
    }

    /// Runs the captured work, consuming it.
    pub fn run(self) -> i64 {
        (self.0)()
    }
}

impl fmt::Debug for WorkqueueOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WorkqueueOp(..)")
    }
}

/// The opcode-tagged payload carried by an SQE.
#[derive(Debug)]
pub enum SqePayload {
    Nop,
    ApiCall(WorkqueueOp),
    ModuleHandle(WorkqueueOp),
}

impl SqePayload {
    pub fn opcode(&self) -> Opcode {
        match self {
            SqePayload::Nop => Opcode::Nop,
            SqePayload::ApiCall(_) => Opcode::ApiCall,
            SqePayload::ModuleHandle(_) => Opcode::ModuleHandle,
        }
    }
}

/// A submission queue entry.
///
/// Valid only between its acquisition by a producer (`Ring::get_sqe`)
/// and its consumption by the next `Ring::submit` — after that the
/// slot it occupied is owned by the ring again.
#[derive(Debug)]
pub struct Sqe {
    pub user_data: u64,
    pub payload: SqePayload,
}

impl Sqe {
    pub fn opcode(&self) -> Opcode {
        self.payload.opcode()
    }
}

/// A completion queue entry.
///
/// `res` carries operation semantics: zero or positive for success,
/// negative for an error code, mirroring the negated-POSIX convention
/// the rest of the error taxonomy uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cqe {
    pub op: Opcode,
    pub res: i64,
    pub flags: u32,
    pub user_data: u64,
}
