//! The workqueue: a bounded circular work buffer serviced by a
//! dynamically sized worker pool.
//!
//! One `Mutex` guards the buffer and worker bookkeeping, with a
//! separate `Condvar` per wait reason (workers waiting for work,
//! producers waiting for room, `wait_all_work_done` waiting for
//! drain). A lock-free ring buffer is deliberately not used here:
//! this contract needs a real rendezvous point for back-pressure and
//! draining, not a spin-retry loop.

use ringcore::envelope::Envelope;
use ringcore::error::{WorkQueueError, WorkQueueResult};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

/// The only defined workqueue flag: spawn `min_threads` eagerly and
/// grow up to `max_threads` on demand, instead of spawning
/// `max_threads` eagerly.
pub const LAZY_THREAD_CREATION: u32 = 1 << 0;

const KNOWN_FLAGS: u32 = LAZY_THREAD_CREATION;

#[derive(Debug, Clone)]
pub struct WorkQueueAttr {
    pub name: String,
    pub flags: u32,
    pub max_threads: usize,
    pub min_threads: usize,
    pub max_pending: usize,
}

impl Default for WorkQueueAttr {
    fn default() -> Self {
        WorkQueueAttr {
            name: String::from("workqueue"),
            flags: 0,
            max_threads: 4,
            min_threads: 0,
            max_pending: 64,
        }
    }
}

fn next_pow2(n: usize) -> usize {
    if n <= 1 {
        return 1;
    }
    n.next_power_of_two()
}

fn validate_and_adjust(mut attr: WorkQueueAttr) -> WorkQueueResult<WorkQueueAttr> {
    if attr.flags & !KNOWN_FLAGS != 0 {
        return Err(WorkQueueError::InvalidArgument);
    }
    if attr.max_threads == 0 {
        attr.max_threads = 4;
    }
    if attr.min_threads > attr.max_threads {
        return Err(WorkQueueError::InvalidArgument);
    }
    attr.max_pending = next_pow2(attr.max_pending.max(1));
    Ok(attr)
}

struct State {
    buf: Vec<Option<Box<dyn Envelope>>>,
    mask: usize,
    head: u32,
    tail: u32,
    should_stop: bool,
    queue_is_blocked: bool,
    wait_all_is_waiting: bool,
    online_workers: usize,
    sleeping_workers: usize,
    running_workers: usize,
    sleeping_producers: usize,
    worker_handles: Vec<JoinHandle<()>>,
}

impl State {
    fn len(&self) -> u32 {
        self.tail.wrapping_sub(self.head)
    }

    fn is_full(&self, capacity: u32) -> bool {
        self.len() == capacity
    }
}

struct Inner {
    attr: WorkQueueAttr,
    capacity: u32,
    state: Mutex<State>,
    worker_cond: Condvar,
    producer_cond: Condvar,
    drain_cond: Condvar,
}

/// A bounded, multi-producer/multi-consumer work buffer with a
/// dynamically sized worker pool.
#[derive(Clone)]
pub struct WorkQueue {
    inner: Arc<Inner>,
}

impl WorkQueue {
    pub fn create(attr: WorkQueueAttr) -> WorkQueueResult<Self> {
        let attr = validate_and_adjust(attr)?;
        let capacity = attr.max_pending as u32;
        let buf = (0..capacity).map(|_| None).collect::<Vec<_>>();

        let inner = Arc::new(Inner {
            capacity,
            state: Mutex::new(State {
                buf,
                mask: attr.max_pending - 1,
                head: 0,
                tail: 0,
                should_stop: false,
                queue_is_blocked: false,
                wait_all_is_waiting: false,
                online_workers: 0,
                sleeping_workers: 0,
                running_workers: 0,
                sleeping_producers: 0,
                worker_handles: Vec::new(),
            }),
            worker_cond: Condvar::new(),
            producer_cond: Condvar::new(),
            drain_cond: Condvar::new(),
            attr,
        });

        let wq = WorkQueue { inner };
        let eager = if wq.inner.attr.flags & LAZY_THREAD_CREATION != 0 {
            wq.inner.attr.min_threads
        } else {
            wq.inner.attr.max_threads
        };

        let mut guard = wq.inner.state.lock().unwrap();
        for _ in 0..eager {
            if spawn_worker(&wq.inner, &mut guard).is_err() {
                // Eager creation failure aborts creation; join whatever
                // already spawned before returning the error.
                let handles = std::mem::take(&mut guard.worker_handles);
                guard.should_stop = true;
                wq.inner.worker_cond.notify_all();
                drop(guard);
                for h in handles {
                    let _ = h.join();
                }
                return Err(WorkQueueError::OutOfMemory);
            }
        }
        drop(guard);

        Ok(wq)
    }

    /// Enqueues a work item, blocking the caller while the queue is
    /// full or while a drain (`wait_all_work_done`) is in progress.
    ///
    /// Returns `Err(OwnerDead)` if the workqueue is stopping; the
    /// caller keeps ownership of `op` in that case (it is returned to
    /// them instead of being dropped, so no deleter runs for it).
    pub fn queue_work(&self, op: Box<dyn Envelope>) -> Result<(), (WorkQueueError, Box<dyn Envelope>)> {
        let inner = &self.inner;
        let mut guard = inner.state.lock().unwrap();

        loop {
            if guard.should_stop {
                return Err((WorkQueueError::OwnerDead, op));
            }
            if guard.queue_is_blocked || guard.is_full(inner.capacity) {
                guard.sleeping_producers += 1;
                guard = inner.producer_cond.wait(guard).unwrap();
                guard.sleeping_producers -= 1;
                continue;
            }
            break;
        }

        let idx = (guard.tail & guard.mask as u32) as usize;
        guard.buf[idx] = Some(op);
        guard.tail = guard.tail.wrapping_add(1);

        if guard.sleeping_workers > 0 {
            inner.worker_cond.notify_one();
        } else if guard.online_workers < inner.attr.max_threads {
            // A spawn failure here does not lose the item: it is
            // already queued, and a sleeping worker or a later
            // enqueue's arm attempt will still pick it up.
            if spawn_worker(inner, &mut guard).is_err() {
                eprintln!(
                    "ringqueue[{}]: lazy worker spawn failed, item remains queued",
                    inner.attr.name
                );
            }
        }

        Ok(())
    }

    /// Blocks until the queue is empty and no worker is running.
    /// New enqueues are rejected (block on the producer side) for the
    /// duration, to prevent a faster producer from starving the drain.
    pub fn wait_all_work_done(&self) {
        let inner = &self.inner;
        let mut guard = inner.state.lock().unwrap();
        guard.queue_is_blocked = true;
        guard.wait_all_is_waiting = true;
        while guard.len() != 0 || guard.running_workers != 0 {
            guard = inner.drain_cond.wait(guard).unwrap();
        }
        guard.wait_all_is_waiting = false;
        guard.queue_is_blocked = false;
        inner.producer_cond.notify_all();
    }

    /// Stops the queue, discards pending work (invoking each item's
    /// `drop_pending`), wakes and joins every worker.
    pub fn destroy(self) {
        let inner = &self.inner;
        let mut guard = inner.state.lock().unwrap();
        guard.should_stop = true;

        let mut discarded = Vec::new();
        while guard.len() != 0 {
            let idx = (guard.head & guard.mask as u32) as usize;
            if let Some(item) = guard.buf[idx].take() {
                discarded.push(item);
            }
            guard.head = guard.head.wrapping_add(1);
        }

        inner.worker_cond.notify_all();
        inner.producer_cond.notify_all();
        inner.drain_cond.notify_all();
        let handles = std::mem::take(&mut guard.worker_handles);
        drop(guard);

        for item in discarded {
            item.drop_pending();
        }
        for h in handles {
            let _ = h.join();
        }
    }

    pub fn active_workers(&self) -> usize {
        self.inner.state.lock().unwrap().online_workers
    }
}

fn spawn_worker(inner: &Arc<Inner>, guard: &mut State) -> Result<(), ()> {
    let worker_inner = Arc::clone(inner);
    let name = format!("{}-worker-{}", inner.attr.name, guard.online_workers);
    match thread::Builder::new().name(name).spawn(move || worker_loop(worker_inner)) {
        Ok(handle) => {
            guard.worker_handles.push(handle);
            guard.online_workers += 1;
            Ok(())
        }
        Err(_) => Err(()),
    }
}

fn worker_loop(inner: Arc<Inner>) {
    loop {
        let item = {
            let mut guard = inner.state.lock().unwrap();
            loop {
                if guard.len() != 0 || guard.should_stop {
                    break;
                }
                guard.sleeping_workers += 1;
                guard = inner.worker_cond.wait(guard).unwrap();
                guard.sleeping_workers -= 1;
            }

            if guard.should_stop && !guard.queue_is_blocked {
                guard.online_workers -= 1;
                return;
            }
            if guard.len() == 0 {
                // Spurious wake during a stop-while-draining race.
                continue;
            }

            let idx = (guard.head & guard.mask as u32) as usize;
            let item = guard.buf[idx].take().expect("slot within [head, tail) is occupied");
            guard.head = guard.head.wrapping_add(1);
            guard.running_workers += 1;
            item
        };

        let _cqe = item.execute();

        let mut guard = inner.state.lock().unwrap();
        guard.running_workers -= 1;
        if guard.sleeping_producers > 0 {
            if guard.sleeping_producers > 1 {
                inner.producer_cond.notify_all();
            } else {
                inner.producer_cond.notify_one();
            }
        }
        if guard.wait_all_is_waiting && guard.len() == 0 && guard.running_workers == 0 {
            inner.drain_cond.notify_all();
        }
    }
}
