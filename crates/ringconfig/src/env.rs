//! Generic environment-variable helpers.
//!
//! A `FromStr`-generic getter with a default, plus a couple of
//! convenience wrappers. No config-file parsing, no clap — this
//! crate's only job is reading the handful of `BOTRING_*` variables
//! `cmd/chatbot` needs.

use std::env;
use std::str::FromStr;

/// Reads `key` from the environment and parses it as `T`, falling
/// back to `default` if unset or unparsable.
pub fn env_get<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Like `env_get`, but returns `None` instead of a default when the
/// variable is unset or unparsable.
pub fn env_get_opt<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Boolean reader accepting "1"/"true"/"yes"/"on" (case-insensitive)
/// as true; anything else as false.
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

pub fn env_get_str(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_is_set(key: &str) -> bool {
    env::var(key).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // std::env is process-global; serialize these tests so they don't
    // race each other's set_var/remove_var calls.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn env_get_default_when_unset() {
        let _g = ENV_LOCK.lock().unwrap();
        env::remove_var("RINGCONFIG_TEST_UNSET");
        assert_eq!(env_get("RINGCONFIG_TEST_UNSET", 7u32), 7);
    }

    #[test]
    fn env_get_parses_set_value() {
        let _g = ENV_LOCK.lock().unwrap();
        env::set_var("RINGCONFIG_TEST_SET", "42");
        assert_eq!(env_get("RINGCONFIG_TEST_SET", 0u32), 42);
        env::remove_var("RINGCONFIG_TEST_SET");
    }

    #[test]
    fn env_get_bool_variants() {
        let _g = ENV_LOCK.lock().unwrap();
        for v in ["1", "true", "TRUE", "yes", "on"] {
            env::set_var("RINGCONFIG_TEST_BOOL", v);
            assert!(env_get_bool("RINGCONFIG_TEST_BOOL", false), "{v} should be true");
        }
        env::set_var("RINGCONFIG_TEST_BOOL", "nope");
        assert!(!env_get_bool("RINGCONFIG_TEST_BOOL", true));
        env::remove_var("RINGCONFIG_TEST_BOOL");
    }

    #[test]
    fn env_get_opt_none_when_unset() {
        let _g = ENV_LOCK.lock().unwrap();
        env::remove_var("RINGCONFIG_TEST_OPT");
        assert_eq!(env_get_opt::<u32>("RINGCONFIG_TEST_OPT"), None);
    }

    #[test]
    fn env_is_set_reflects_presence() {
        let _g = ENV_LOCK.lock().unwrap();
        env::remove_var("RINGCONFIG_TEST_PRESENT");
        assert!(!env_is_set("RINGCONFIG_TEST_PRESENT"));
        env::set_var("RINGCONFIG_TEST_PRESENT", "x");
        assert!(env_is_set("RINGCONFIG_TEST_PRESENT"));
        env::remove_var("RINGCONFIG_TEST_PRESENT");
    }
}
