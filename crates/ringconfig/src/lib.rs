//! Ambient configuration loading for the `chatbot` binary.
//!
//! `ringcore` and `ringqueue` stay environment-free — the ring and
//! workqueue take no environment input at all. This crate is the
//! ambient layer above them, read once at startup by `cmd/chatbot`.

pub mod env;

use env::{env_get, env_get_str};

/// Process-wide knobs read once at startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Requested SQ capacity; the ring rounds this up to a power of two.
    pub sq_entries: usize,
    pub min_threads: usize,
    pub max_threads: usize,
    pub max_pending: usize,
    /// Simulated network latency for the mock API client.
    pub poll_interval_ms: u64,
    pub log_level: String,
}

impl BotConfig {
    pub fn from_env() -> Self {
        BotConfig {
            sq_entries: env_get("BOTRING_SQ_ENTRIES", 256),
            min_threads: env_get("BOTRING_MIN_THREADS", 32),
            max_threads: env_get("BOTRING_MAX_THREADS", 1024),
            max_pending: env_get("BOTRING_MAX_PENDING", 4096),
            poll_interval_ms: env_get("BOTRING_POLL_INTERVAL_MS", 0),
            log_level: env_get_str("BOTRING_LOG_LEVEL", "info"),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            sq_entries: 256,
            min_threads: 32,
            max_threads: 1024,
            max_pending: 4096,
            poll_interval_ms: 0,
            log_level: String::from("info"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn from_env_falls_back_to_defaults() {
        let _g = ENV_LOCK.lock().unwrap();
        for key in [
            "BOTRING_SQ_ENTRIES",
            "BOTRING_MIN_THREADS",
            "BOTRING_MAX_THREADS",
            "BOTRING_MAX_PENDING",
            "BOTRING_POLL_INTERVAL_MS",
            "BOTRING_LOG_LEVEL",
        ] {
            std::env::remove_var(key);
        }
        let cfg = BotConfig::from_env();
        assert_eq!(cfg.sq_entries, 256);
        assert_eq!(cfg.log_level, "info");
    }
}
