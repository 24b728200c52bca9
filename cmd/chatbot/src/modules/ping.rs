//! Replies "Pong!" to any message starting with `/ping`, `.ping`, or
//! `!ping`.

use ringdispatch::{update_types, ApiClient, BotModule, Update};
use std::sync::Arc;

const PREFIXES: [&str; 3] = ["/ping", ".ping", "!ping"];

pub struct PingModule;

impl BotModule for PingModule {
    fn name(&self) -> &str {
        "ping"
    }

    fn listen_update_types(&self) -> u32 {
        update_types::MESSAGE
    }

    fn handle(&self, api: &Arc<dyn ApiClient>, update: &Update) -> i64 {
        if !PREFIXES.iter().any(|p| update.text.starts_with(p)) {
            return 0;
        }
        api.send_message(update.chat_id, "Pong!")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct RecordingApi {
        last_chat: AtomicI64,
    }
    impl ApiClient for RecordingApi {
        fn get_updates(&self, _offset: u64) -> Result<Vec<Update>, i64> {
            Ok(Vec::new())
        }
        fn send_message(&self, chat_id: i64, _text: &str) -> i64 {
            self.last_chat.store(chat_id, Ordering::SeqCst);
            0
        }
    }

    fn message(text: &str) -> Update {
        Update {
            update_id: 1,
            update_type: update_types::MESSAGE,
            chat_id: 99,
            text: text.to_string(),
        }
    }

    #[test]
    fn replies_pong_to_any_recognized_prefix() {
        let api: Arc<dyn ApiClient> = Arc::new(RecordingApi {
            last_chat: AtomicI64::new(0),
        });
        let module = PingModule;
        for prefix in PREFIXES {
            let rc = module.handle(&api, &message(prefix));
            assert_eq!(rc, 0);
        }
    }

    #[test]
    fn ignores_unrelated_messages() {
        let calls = Arc::new(AtomicI64::new(-1));
        struct Spy(Arc<AtomicI64>);
        impl ApiClient for Spy {
            fn get_updates(&self, _offset: u64) -> Result<Vec<Update>, i64> {
                Ok(Vec::new())
            }
            fn send_message(&self, chat_id: i64, _text: &str) -> i64 {
                self.0.store(chat_id, Ordering::SeqCst);
                0
            }
        }
        let api: Arc<dyn ApiClient> = Arc::new(Spy(calls.clone()));
        let module = PingModule;
        module.handle(&api, &message("hello there"));
        assert_eq!(calls.load(Ordering::SeqCst), -1, "send_message must not be called");
    }
}
