//! The ring: a bounded SQ/CQ pair dispatching inline or to an embedded
//! workqueue.
//!
//! Two notable design choices, both recorded in `DESIGN.md`:
//!
//! - `get_sqe` takes a fully-built [`ringcore::Sqe`] by value instead
//!   of returning a pointer into a slot for the caller to fill in
//!   place — Rust's ownership model makes "construct, then hand over"
//!   the natural shape, and a raw pointer into a mutex-guarded `Vec`
//!   would need `unsafe` to expose soundly.
//! - `MODULE_HANDLE` enqueue failure posts a completion carrying the
//!   failure code (the stricter variant design note §9 recommends)
//!   instead of silently dropping the submission.

use ringcore::envelope::Envelope;
use ringcore::error::{RingError, RingResult};
use ringcore::opcode::{Cqe, Opcode, Sqe, SqePayload, WorkqueueOp};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use crate::workqueue::{WorkQueue, WorkQueueAttr, LAZY_THREAD_CREATION};

/// Negated-POSIX-style completion codes, matching the convention the
/// rest of the error taxonomy (`ringcore::error`) uses.
pub mod errno {
    pub const EINVAL: i64 = -22;
    pub const ENOMEM: i64 = -12;
    pub const EOWNERDEAD: i64 = -130;
}

fn next_pow2(n: usize) -> usize {
    if n <= 1 {
        1
    } else {
        n.next_power_of_two()
    }
}

struct SqState {
    buf: Vec<Option<Sqe>>,
    mask: u32,
    head: u32,
    tail: u32,
}

struct CqState {
    buf: Vec<Cqe>,
    mask: u32,
    head: u32,
    tail: u32,
    waiting: bool,
}

struct RingInner {
    sq_capacity: u32,
    cq_capacity: u32,
    sq: Mutex<SqState>,
    cq: Mutex<CqState>,
    cq_cond: Condvar,
    should_stop: AtomicBool,
    wq: WorkQueue,
}

/// A submission/completion ring with an embedded worker pool.
#[derive(Clone)]
pub struct Ring {
    inner: Arc<RingInner>,
}

impl Ring {
    /// Allocates an SQ of `next_pow2(n)` and a CQ of twice that, with
    /// an internal workqueue sized `min_threads=32, max_threads=1024,
    /// max_pending=4096`, lazily spawned — exactly as specified for
    /// `init`.
    pub fn init(n: usize) -> Self {
        Self::init_with_workqueue(n, 32, 1024, 4096)
    }

    /// As [`Ring::init`], but with the embedded workqueue's sizing
    /// knobs taken from the caller instead of hardcoded — this is what
    /// lets `BOTRING_MIN_THREADS`/`BOTRING_MAX_THREADS`/
    /// `BOTRING_MAX_PENDING` actually reach the workqueue that backs
    /// `API_CALL`/`MODULE_HANDLE` dispatch.
    pub fn init_with_workqueue(n: usize, min_threads: usize, max_threads: usize, max_pending: usize) -> Self {
        let sq_capacity = next_pow2(n.max(1)) as u32;
        let cq_capacity = sq_capacity * 2;

        let wq = WorkQueue::create(WorkQueueAttr {
            name: String::from("ring-wq"),
            flags: LAZY_THREAD_CREATION,
            min_threads,
            max_threads,
            max_pending,
        })
        .expect("ring workqueue eager min-thread creation should not fail");

        let sq = SqState {
            buf: (0..sq_capacity).map(|_| None).collect(),
            mask: sq_capacity - 1,
            head: 0,
            tail: 0,
        };
        let cq = CqState {
            buf: vec![
                Cqe {
                    op: Opcode::Nop,
                    res: 0,
                    flags: 0,
                    user_data: 0
                };
                cq_capacity as usize
            ],
            mask: cq_capacity - 1,
            head: 0,
            tail: 0,
            waiting: false,
        };

        Ring {
            inner: Arc::new(RingInner {
                sq_capacity,
                cq_capacity,
                sq: Mutex::new(sq),
                cq: Mutex::new(cq),
                cq_cond: Condvar::new(),
                should_stop: AtomicBool::new(false),
                wq,
            }),
        }
    }

    pub fn sq_capacity(&self) -> u32 {
        self.inner.sq_capacity
    }

    pub fn cq_capacity(&self) -> u32 {
        self.inner.cq_capacity
    }

    /// Reserves and fills one SQ slot. Returns the SQE back to the
    /// caller (unqueued) if the SQ is full.
    pub fn get_sqe(&self, sqe: Sqe) -> Result<(), Sqe> {
        let mut guard = self.inner.sq.lock().unwrap();
        if guard.tail.wrapping_sub(guard.head) == self.inner.sq_capacity {
            return Err(sqe);
        }
        let idx = (guard.tail & guard.mask) as usize;
        guard.buf[idx] = Some(sqe);
        guard.tail = guard.tail.wrapping_add(1);
        Ok(())
    }

    /// Drains every reserved SQE and dispatches it by opcode. Holds
    /// the SQ lock for the duration of the drain: the lock-ordering
    /// rule (producers may hold the SQ lock while acquiring the
    /// workqueue lock) makes this sound, at the cost of a producer
    /// blocking on workqueue back-pressure stalling other submitters
    /// too — an accepted trade-off per the design's own lock ordering
    /// note.
    pub fn submit(&self) -> RingResult<usize> {
        if self.inner.should_stop.load(Ordering::Acquire) {
            return Err(RingError::OwnerDead);
        }

        let mut sq = self.inner.sq.lock().unwrap();
        let mut dispatched = 0usize;
        while sq.head != sq.tail {
            let idx = (sq.head & sq.mask) as usize;
            let sqe = sq.buf[idx]
                .take()
                .expect("slot within [sq_head, sq_tail) is occupied");
            sq.head = sq.head.wrapping_add(1);

            if self.dispatch(sqe) {
                dispatched += 1;
            }
        }
        Ok(dispatched)
    }

    /// Returns `true` if the entry was dispatched (inline or handed
    /// to the workqueue); `false` if it was skipped on a submission
    /// failure the base contract does not post a completion for.
    fn dispatch(&self, sqe: Sqe) -> bool {
        let user_data = sqe.user_data;
        match sqe.payload {
            SqePayload::Nop => {
                self.post_cqe(Cqe {
                    op: Opcode::Nop,
                    res: 0,
                    flags: 0,
                    user_data,
                });
                true
            }
            SqePayload::ApiCall(op) => self.dispatch_to_workqueue(Opcode::ApiCall, user_data, op, false),
            SqePayload::ModuleHandle(op) => {
                self.dispatch_to_workqueue(Opcode::ModuleHandle, user_data, op, true)
            }
        }
    }

    fn dispatch_to_workqueue(
        &self,
        op: Opcode,
        user_data: u64,
        work: WorkqueueOp,
        post_failure_cqe: bool,
    ) -> bool {
        let envelope: Box<dyn Envelope> = Box::new(RingTaskEnvelope {
            ring: self.clone(),
            op,
            user_data,
            work,
        });
        match self.inner.wq.queue_work(envelope) {
            Ok(()) => true,
            Err((e, _envelope)) => {
                // `_envelope` drops here, releasing the payload's
                // captured resources immediately, as required on
                // enqueue failure.
                if post_failure_cqe {
                    self.post_cqe(Cqe {
                        op,
                        res: errno_for(e),
                        flags: 0,
                        user_data,
                    });
                }
                false
            }
        }
    }

    pub(crate) fn post_cqe(&self, cqe: Cqe) {
        let mut guard = self.inner.cq.lock().unwrap();
        let len = guard.tail.wrapping_sub(guard.head);
        if len == self.inner.cq_capacity {
            drop(guard);
            panic!(
                "ring CQ overflow posting {} user_data={}: consumer is not calling cq_advance",
                cqe.op, cqe.user_data
            );
        }
        let idx = (guard.tail & guard.mask) as usize;
        guard.buf[idx] = cqe;
        guard.tail = guard.tail.wrapping_add(1);
        if guard.waiting {
            self.inner.cq_cond.notify_all();
        }
    }

    /// Blocks until at least one CQE is visible, returning the count,
    /// or `OwnerDead` if the ring stops while waiting.
    pub fn wait_cqe(&self) -> RingResult<usize> {
        let mut guard = self.inner.cq.lock().unwrap();
        guard.waiting = true;
        while guard.tail == guard.head && !self.inner.should_stop.load(Ordering::Acquire) {
            guard = self.inner.cq_cond.wait(guard).unwrap();
        }
        guard.waiting = false;
        let len = guard.tail.wrapping_sub(guard.head);
        if len == 0 {
            return Err(RingError::OwnerDead);
        }
        Ok(len as usize)
    }

    /// Snapshots every currently visible CQE from `cq_head` forward.
    /// The caller must follow up with `cq_advance` to release them.
    pub fn for_each_cqe(&self) -> Vec<Cqe> {
        let guard = self.inner.cq.lock().unwrap();
        let len = guard.tail.wrapping_sub(guard.head);
        (0..len)
            .map(|i| guard.buf[((guard.head.wrapping_add(i)) & guard.mask) as usize])
            .collect()
    }

    pub fn cq_advance(&self, n: u32) {
        let mut guard = self.inner.cq.lock().unwrap();
        guard.head = guard.head.wrapping_add(n);
    }

    /// Stops the ring, wakes any `wait_cqe` waiter, and drains the
    /// embedded workqueue (discarding pending work, joining workers).
    pub fn destroy(&self) {
        self.inner.should_stop.store(true, Ordering::Release);
        self.inner.cq_cond.notify_all();
        self.inner.wq.clone().destroy();
    }
}

fn errno_for(e: ringcore::error::WorkQueueError) -> i64 {
    use ringcore::error::WorkQueueError::*;
    match e {
        InvalidArgument => errno::EINVAL,
        OutOfMemory => errno::ENOMEM,
        OwnerDead => errno::EOWNERDEAD,
    }
}

struct RingTaskEnvelope {
    ring: Ring,
    op: Opcode,
    user_data: u64,
    work: WorkqueueOp,
}

impl std::fmt::Debug for RingTaskEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingTaskEnvelope")
            .field("op", &self.op)
            .field("user_data", &self.user_data)
            .field("work", &self.work)
            .finish()
    }
}

impl Envelope for RingTaskEnvelope {
    fn execute(self: Box<Self>) -> Cqe {
        let res = self.work.run();
        let cqe = Cqe {
            op: self.op,
            res,
            flags: 0,
            user_data: self.user_data,
        };
        self.ring.post_cqe(cqe);
        cqe
    }

    fn drop_pending(self: Box<Self>) {
        // Dropping `self.work` releases whatever it captured; no
        // completion is posted for work discarded at ring/workqueue
        // shutdown, matching "pending items invoke their deleter but
        // not their func" with no observable CQE either.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn init_sizes_sq_and_cq_to_power_of_two() {
        let ring = Ring::init(10);
        assert_eq!(ring.sq_capacity(), 16);
        assert_eq!(ring.cq_capacity(), 32);
        ring.destroy();
    }

    #[test]
    fn nop_batch_round_trips_user_data() {
        let ring = Ring::init(10);
        for i in 0..16u64 {
            ring.get_sqe(Sqe {
                user_data: i,
                payload: SqePayload::Nop,
            })
            .unwrap();
        }
        assert_eq!(ring.submit().unwrap(), 16);
        assert_eq!(ring.wait_cqe().unwrap(), 16);

        let cqes = ring.for_each_cqe();
        assert_eq!(cqes.len(), 16);
        let seen: HashSet<u64> = cqes
            .iter()
            .map(|c| {
                assert_eq!(c.res, 0);
                assert_eq!(c.flags, 0);
                c.user_data
            })
            .collect();
        assert_eq!(seen, (0..16).collect());
        ring.cq_advance(16);
        ring.destroy();
    }

    #[test]
    fn sq_full_returns_sqe_to_caller() {
        let ring = Ring::init(4);
        for i in 0..4u64 {
            ring.get_sqe(Sqe {
                user_data: i,
                payload: SqePayload::Nop,
            })
            .unwrap();
        }
        let rejected = ring.get_sqe(Sqe {
            user_data: 99,
            payload: SqePayload::Nop,
        });
        assert!(rejected.is_err());
        assert_eq!(rejected.err().unwrap().user_data, 99);
        ring.destroy();
    }

    #[test]
    fn cq_round_trips_at_exactly_double_sq_capacity() {
        let ring = Ring::init(10);
        // Fill the CQ to exactly its capacity (32 = 2x the 16-entry
        // SQ) across two full-SQ rounds of 16 NOPs each, then drain
        // it in one shot — the oversubscription boundary must still
        // round-trip cleanly when it is not exceeded.
        for round in 0..2u64 {
            for i in 0..16u64 {
                ring.get_sqe(Sqe {
                    user_data: round * 16 + i,
                    payload: SqePayload::Nop,
                })
                .unwrap();
            }
            ring.submit().unwrap();
        }

        assert_eq!(ring.wait_cqe().unwrap(), 32);
        let cqes = ring.for_each_cqe();
        assert_eq!(cqes.len(), 32);
        let seen: HashSet<u64> = cqes
            .iter()
            .map(|c| {
                assert_eq!(c.res, 0);
                c.user_data
            })
            .collect();
        assert_eq!(seen, (0..32).collect());
        ring.cq_advance(32);
        ring.destroy();
    }

    #[test]
    fn cq_overflow_past_capacity_is_a_panic() {
        let ring = Ring::init(10);
        // Fill the CQ to capacity (32) without ever calling
        // cq_advance, across two full-SQ rounds of 16 NOPs each.
        for round in 0..2u64 {
            for i in 0..16u64 {
                ring.get_sqe(Sqe {
                    user_data: round * 16 + i,
                    payload: SqePayload::Nop,
                })
                .unwrap();
            }
            ring.submit().unwrap();
        }

        // A third round's inline NOP dispatch now posts into an
        // already-full CQ: this must panic rather than drop silently.
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            ring.get_sqe(Sqe {
                user_data: 999,
                payload: SqePayload::Nop,
            })
            .unwrap();
            ring.submit().unwrap();
        }));
        assert!(result.is_err(), "posting past CQ capacity must panic");
    }

    #[test]
    fn submit_is_idempotent_on_empty_sq() {
        let ring = Ring::init(8);
        assert_eq!(ring.submit().unwrap(), 0);
        ring.destroy();
    }

    #[test]
    fn api_call_runs_on_workqueue_and_posts_result() {
        let ring = Ring::init(8);
        ring.get_sqe(Sqe {
            user_data: 7,
            payload: SqePayload::ApiCall(WorkqueueOp::new(|| 42)),
        })
        .unwrap();
        ring.submit().unwrap();
        assert_eq!(ring.wait_cqe().unwrap(), 1);
        let cqes = ring.for_each_cqe();
        assert_eq!(cqes[0].op, Opcode::ApiCall);
        assert_eq!(cqes[0].res, 42);
        assert_eq!(cqes[0].user_data, 7);
        ring.cq_advance(1);
        ring.destroy();
    }

    #[test]
    fn destroy_wakes_a_blocked_waiter() {
        let ring = Ring::init(8);
        let waiter_ring = ring.clone();
        let handle = thread::spawn(move || waiter_ring.wait_cqe());

        thread::sleep(Duration::from_millis(20));
        ring.destroy();

        let result = handle.join().unwrap();
        assert_eq!(result, Err(RingError::OwnerDead));
    }
}
