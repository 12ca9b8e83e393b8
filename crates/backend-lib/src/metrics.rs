// ============================
// crates/backend-lib/src/metrics.rs
// ============================
//! Metric keys and the file server hit counter.
use std::sync::atomic::{AtomicU64, Ordering};

pub const LOGIN_SUCCEEDED: &str = "auth.login.succeeded";
pub const LOGIN_FAILED: &str = "auth.login.failed";
pub const TOKEN_REFRESHED: &str = "auth.token.refreshed";
pub const TOKEN_REVOKED: &str = "auth.token.revoked";
pub const USER_CREATED: &str = "user.created";
pub const USER_UPGRADED: &str = "user.upgraded";
pub const CHIRP_CREATED: &str = "chirp.created";
pub const CHIRP_DELETED: &str = "chirp.deleted";
pub const FILESERVER_HITS: &str = "fileserver.hits";

/// Number of requests served from `/app`
#[derive(Debug, Default)]
pub struct HitCounter(AtomicU64);

impl HitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) -> u64 {
        metrics::counter!(FILESERVER_HITS).increment(1);
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_hit_counter() {
        let hits = HitCounter::new();
        assert_eq!(hits.get(), 0);
        assert_eq!(hits.increment(), 1);
        assert_eq!(hits.increment(), 2);
        hits.reset();
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_hit_counter_across_threads() {
        let hits = Arc::new(HitCounter::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let hits = hits.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        hits.increment();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(hits.get(), 800);
    }
}
