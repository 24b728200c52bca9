//! The task envelope: the workqueue's heap-owned copy of a submitted
//! SQE, plus what a worker needs to run it and post its completion.
//!
//! Design note §9 of the ring/workqueue design asks for this to be a
//! trait with `execute` and `drop_pending`, rather than a raw
//! `(fn, arg, deleter)` triple, so that "every payload resource is
//! released exactly once, whether or not it ran" is a property the
//! type system enforces instead of a convention every opcode's worker
//! function has to remember to uphold.

use crate::opcode::{Cqe, Opcode, WorkqueueOp};

/// A unit of work the workqueue will either run or discard.
///
/// `execute` consumes the envelope and returns the CQE the ring should
/// post. `drop_pending` consumes it without running the work — for a
/// `TaskEnvelope`, that is simply `drop`, since the envelope's only
/// owned resource is the `WorkqueueOp` closure, and dropping an unrun
/// closure drops everything it captured.
pub trait Envelope: Send + std::fmt::Debug {
    fn execute(self: Box<Self>) -> Cqe;
    fn drop_pending(self: Box<Self>);
}

/// The one concrete envelope shape the ring currently produces: an
/// opcode, its correlating `user_data`, and the boxed closure that
/// performs the work. Both workqueue-dispatched opcodes (`API_CALL`,
/// `MODULE_HANDLE`) use this same envelope — only the opcode tag and
/// the closure's captured state differ.
#[derive(Debug)]
pub struct TaskEnvelope {
    op: Opcode,
    user_data: u64,
    work: WorkqueueOp,
}

impl TaskEnvelope {
    pub fn new(op: Opcode, user_data: u64, work: WorkqueueOp) -> Self {
        TaskEnvelope {
            op,
            user_data,
            work,
        }
    }
}

impl Envelope for TaskEnvelope {
    fn execute(self: Box<Self>) -> Cqe {
        let res = self.work.run();
        Cqe {
            op: self.op,
            res,
            flags: 0,
            user_data: self.user_data,
        }
    }

    fn drop_pending(self: Box<Self>) {
        // Dropping `self.work` without calling `run` releases whatever
        // it captured; nothing further to do.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn execute_runs_work_and_echoes_user_data() {
        let env = Box::new(TaskEnvelope::new(
            Opcode::ApiCall,
            42,
            WorkqueueOp::new(|| 7),
        ));
        let cqe = env.execute();
        assert_eq!(cqe.op, Opcode::ApiCall);
        assert_eq!(cqe.res, 7);
        assert_eq!(cqe.user_data, 42);
        assert_eq!(cqe.flags, 0);
    }

    #[test]
    fn drop_pending_releases_captured_resource_without_running() {
        let ran = Arc::new(AtomicBool::new(false));
        let released = Arc::new(AtomicBool::new(false));

        struct Guard(Arc<AtomicBool>);
        impl Drop for Guard {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let guard = Guard(released.clone());
        let ran_clone = ran.clone();
        let env = Box::new(TaskEnvelope::new(
            Opcode::ModuleHandle,
            1,
            WorkqueueOp::new(move || {
                ran_clone.store(true, Ordering::SeqCst);
                let _ = &guard;
                0
            }),
        ));

        env.drop_pending();

        assert!(!ran.load(Ordering::SeqCst), "func must not run on discard");
        assert!(
            released.load(Ordering::SeqCst),
            "deleter-equivalent resource release must still happen"
        );
    }
}
