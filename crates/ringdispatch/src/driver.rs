//! The driver loop: the single consumer of the ring's completions.
//!
//! The polling subscription is an armed operation: its own completion
//! handler re-arms it, so the ring is never idle while the loop runs.

use ringcore::opcode::{Cqe, Opcode, Sqe, SqePayload, WorkqueueOp};
use ringqueue::Ring;
use std::sync::{Arc, Mutex};

use crate::module::{ApiClient, ModuleRegistry, Update};

/// `user_data` tag for the armed polling subscription's SQEs. All
/// other SQEs (`MODULE_HANDLE`) are tagged with their update's id.
const POLL_TAG: u64 = u64::MAX;

struct DriverState {
    ring: Ring,
    api: Arc<dyn ApiClient>,
    modules: Arc<ModuleRegistry>,
    max_update_id: Mutex<u64>,
    fetched: Mutex<Vec<Update>>,
}

/// Owns everything the driver loop needs: the ring, the API client,
/// and the module registry. Construct once per bot process.
pub struct Driver {
    state: Arc<DriverState>,
}

impl Driver {
    pub fn new(ring: Ring, api: Arc<dyn ApiClient>, modules: ModuleRegistry) -> Self {
        Driver {
            state: Arc::new(DriverState {
                ring,
                api,
                modules: Arc::new(modules),
                max_update_id: Mutex::new(0),
                fetched: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Arms (or re-arms) the polling subscription: one `API_CALL`
    /// SQE whose body fetches updates past `max_update_id` and stores
    /// them for the completion handler to fan out.
    fn arm_poll(&self) {
        let state = self.state.clone();
        let offset = *self.state.max_update_id.lock().unwrap();
        let op = WorkqueueOp::new(move || match state.api.get_updates(offset) {
            Ok(updates) => {
                let n = updates.len() as i64;
                *state.fetched.lock().unwrap() = updates;
                n
            }
            Err(code) => code,
        });

        match self.state.ring.get_sqe(Sqe {
            user_data: POLL_TAG,
            payload: SqePayload::ApiCall(op),
        }) {
            Ok(()) => {}
            Err(_sqe) => {
                eprintln!("botring: SQ full, dropping this poll re-arm; will retry next loop pass");
            }
        }
    }

    fn process_cqe(&self, cqe: &Cqe) {
        match cqe.op {
            Opcode::Nop => {}
            Opcode::ApiCall => {
                if cqe.res < 0 {
                    eprintln!("botring: poll failed, res={}", cqe.res);
                } else {
                    let updates = std::mem::take(&mut *self.state.fetched.lock().unwrap());
                    for update in updates {
                        let mut max_id = self.state.max_update_id.lock().unwrap();
                        if update.update_id > *max_id {
                            *max_id = update.update_id;
                        }
                        drop(max_id);
                        self.submit_module_handle(update);
                    }
                }
                // Re-arm unconditionally, success or failure, exactly
                // as `process_tg_api_updates`'s `out:` label does.
                self.arm_poll();
            }
            Opcode::ModuleHandle => {
                if cqe.res < 0 {
                    eprintln!(
                        "botring: module handling failed for update {}: res={}",
                        cqe.user_data, cqe.res
                    );
                }
            }
        }
    }

    fn submit_module_handle(&self, update: Update) {
        let state = self.state.clone();
        let update_id = update.update_id;
        let op = WorkqueueOp::new(move || state.modules.handle_update(&state.api, &update));

        if let Err(_sqe) = self.state.ring.get_sqe(Sqe {
            user_data: update_id,
            payload: SqePayload::ModuleHandle(op),
        }) {
            eprintln!("botring: SQ full, dropping update {}", update_id);
        }
    }

    /// Arms the poll once, then loops submit → wait_cqe → for_each_cqe
    /// → cq_advance until the ring reports `OwnerDead` (set by
    /// `ring.destroy()` from another thread, e.g. a signal handler).
    pub fn run(&self) {
        self.state.modules.init_all(&self.state.api);
        self.arm_poll();

        loop {
            if self.state.ring.submit().is_err() {
                break;
            }
            match self.state.ring.wait_cqe() {
                Ok(_) => {
                    let cqes = self.state.ring.for_each_cqe();
                    for cqe in &cqes {
                        self.process_cqe(cqe);
                    }
                    self.state.ring.cq_advance(cqes.len() as u32);
                }
                Err(_) => break,
            }
        }

        self.state.modules.shutdown_all();
    }
}
