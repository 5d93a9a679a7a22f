use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

static RATE_LIMITER: Lazy<Mutex<HashMap<String, (u32, Instant)>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Fixed-window counter keyed by caller IP; applied to the login
/// endpoints only.
pub fn check(key: &str, limit: u32, window_secs: u64) -> bool {
    let mut map = RATE_LIMITER.lock().unwrap();
    let entry = map.entry(key.to_string()).or_insert((0, Instant::now()));
    if entry.1.elapsed() > Duration::from_secs(window_secs) {
        *entry = (0, Instant::now());
    }
    if entry.0 >= limit {
        return false;
    }
    entry.0 += 1;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit_then_blocks() {
        let key = "203.0.113.77:test-window";
        for _ in 0..5 {
            assert!(check(key, 5, 60));
        }
        assert!(!check(key, 5, 60));
    }

    #[test]
    fn keys_are_independent() {
        assert!(check("198.51.100.1:a", 1, 60));
        assert!(check("198.51.100.2:a", 1, 60));
        assert!(!check("198.51.100.1:a", 1, 60));
    }
}
