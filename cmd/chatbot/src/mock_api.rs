//! A stand-in for a real HTTP-backed chat API client. This exists
//! only to give the driver loop something to poll and reply through.

use ringdispatch::{update_types, ApiClient, Update};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

/// Replays a fixed script of incoming messages, one batch per call,
/// then reports no further updates. Simulates network latency via
/// `poll_interval_ms` the way a real long-poll call would block.
pub struct MockApiClient {
    script: Mutex<Vec<Vec<(i64, String)>>>,
    next_update_id: AtomicU64,
    poll_interval: Duration,
}

impl MockApiClient {
    pub fn new(script: Vec<Vec<(i64, String)>>, poll_interval_ms: u64) -> Self {
        MockApiClient {
            script: Mutex::new(script),
            next_update_id: AtomicU64::new(1),
            poll_interval: Duration::from_millis(poll_interval_ms),
        }
    }
}

impl ApiClient for MockApiClient {
    fn get_updates(&self, _offset: u64) -> Result<Vec<Update>, i64> {
        if !self.poll_interval.is_zero() {
            thread::sleep(self.poll_interval);
        }
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            return Ok(Vec::new());
        }
        let batch = script.remove(0);
        let updates = batch
            .into_iter()
            .map(|(chat_id, text)| Update {
                update_id: self.next_update_id.fetch_add(1, Ordering::SeqCst),
                update_type: update_types::MESSAGE,
                chat_id,
                text,
            })
            .collect();
        Ok(updates)
    }

    fn send_message(&self, chat_id: i64, text: &str) -> i64 {
        println!("[chat {chat_id}] bot: {text}");
        0
    }
}
