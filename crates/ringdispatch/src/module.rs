//! Handler modules and the polling API client contract.
//!
//! A real deployment backs `ApiClient` with an HTTP client and JSON
//! parsing, and registers real `BotModule`s. This crate only defines
//! the interfaces those collaborators satisfy and the fan-out logic
//! that dispatches an `Update` to them.

use std::sync::Arc;

/// A minimal stand-in for the remote API's event payload. A real
/// implementation's `Update` carries the full parsed entity model;
/// this crate only needs enough to route and to demonstrate a module.
#[derive(Debug, Clone)]
pub struct Update {
    pub update_id: u64,
    pub update_type: u32,
    pub chat_id: i64,
    pub text: String,
}

/// Bitmask update-type constants a module ORs together to declare
/// which kinds of updates its `handle` wants to see.
pub mod update_types {
    pub const MESSAGE: u32 = 1 << 0;
    pub const EDITED_MESSAGE: u32 = 1 << 1;
    pub const CALLBACK_QUERY: u32 = 1 << 2;
}

/// The polling API client contract. Submitted to the ring as the body
/// of an `ApiCall` operation; never called by the ring directly.
pub trait ApiClient: Send + Sync {
    /// Fetches updates with `update_id > offset`.
    fn get_updates(&self, offset: u64) -> Result<Vec<Update>, i64>;
    /// Sends a text reply. Returns a negated-errno on failure, 0 on success.
    fn send_message(&self, chat_id: i64, text: &str) -> i64;
}

/// A pluggable handler, grounded on `gw_bot_module`'s
/// `{name, listen_update_types, init, handle, shutdown}` shape.
pub trait BotModule: Send + Sync {
    fn name(&self) -> &str;
    fn listen_update_types(&self) -> u32;
    fn init(&self, api: &Arc<dyn ApiClient>) -> i64 {
        let _ = api;
        0
    }
    /// Handles one update. A nonzero return stops further modules
    /// from seeing this update (`gw_module_handle`'s
    /// stop-on-first-nonzero-return rule).
    fn handle(&self, api: &Arc<dyn ApiClient>, update: &Update) -> i64;
    fn shutdown(&self) {}
}

/// An ordered collection of modules, fanned out to in registration
/// order — matching `gw_init_modules`/`gw_module_handle`/`gw_shutdown_modules`.
pub struct ModuleRegistry {
    modules: Vec<Box<dyn BotModule>>,
}

impl ModuleRegistry {
    pub fn new(modules: Vec<Box<dyn BotModule>>) -> Self {
        ModuleRegistry { modules }
    }

    pub fn init_all(&self, api: &Arc<dyn ApiClient>) {
        for module in &self.modules {
            let rc = module.init(api);
            if rc != 0 {
                eprintln!("botring: module '{}' init returned {}", module.name(), rc);
            }
        }
    }

    /// Routes `update` to every module whose `listen_update_types`
    /// bitmask intersects `update.update_type`, in registration order,
    /// stopping at the first module that returns nonzero.
    pub fn handle_update(&self, api: &Arc<dyn ApiClient>, update: &Update) -> i64 {
        for module in &self.modules {
            if module.listen_update_types() & update.update_type == 0 {
                continue;
            }
            let rc = module.handle(api, update);
            if rc != 0 {
                return rc;
            }
        }
        0
    }

    pub fn shutdown_all(&self) {
        for module in &self.modules {
            module.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubApi;
    impl ApiClient for StubApi {
        fn get_updates(&self, _offset: u64) -> Result<Vec<Update>, i64> {
            Ok(Vec::new())
        }
        fn send_message(&self, _chat_id: i64, _text: &str) -> i64 {
            0
        }
    }

    struct CountingModule {
        mask: u32,
        calls: Arc<AtomicUsize>,
        rc: i64,
    }
    impl BotModule for CountingModule {
        fn name(&self) -> &str {
            "counting"
        }
        fn listen_update_types(&self) -> u32 {
            self.mask
        }
        fn handle(&self, _api: &Arc<dyn ApiClient>, _update: &Update) -> i64 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.rc
        }
    }

    #[test]
    fn routes_only_to_modules_listening_for_the_update_type() {
        let api: Arc<dyn ApiClient> = Arc::new(StubApi);
        let a_calls = Arc::new(AtomicUsize::new(0));
        let b_calls = Arc::new(AtomicUsize::new(0));
        let a = CountingModule {
            mask: update_types::MESSAGE,
            calls: a_calls.clone(),
            rc: 0,
        };
        let b = CountingModule {
            mask: update_types::CALLBACK_QUERY,
            calls: b_calls.clone(),
            rc: 0,
        };
        let registry = ModuleRegistry::new(vec![Box::new(a), Box::new(b)]);

        let update = Update {
            update_id: 1,
            update_type: update_types::MESSAGE,
            chat_id: 1,
            text: String::from("hi"),
        };
        registry.handle_update(&api, &update);

        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stops_at_first_nonzero_return() {
        let api: Arc<dyn ApiClient> = Arc::new(StubApi);
        let b_calls = Arc::new(AtomicUsize::new(0));
        let a = CountingModule {
            mask: update_types::MESSAGE,
            calls: Arc::new(AtomicUsize::new(0)),
            rc: 1,
        };
        let b = CountingModule {
            mask: update_types::MESSAGE,
            calls: b_calls.clone(),
            rc: 0,
        };
        let registry = ModuleRegistry::new(vec![Box::new(a), Box::new(b)]);
        let update = Update {
            update_id: 1,
            update_type: update_types::MESSAGE,
            chat_id: 1,
            text: String::from("hi"),
        };
        let rc = registry.handle_update(&api, &update);
        assert_eq!(rc, 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 0, "second module must not run");
    }
}
