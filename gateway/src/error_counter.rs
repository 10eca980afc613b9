//! Process-wide monotonically increasing error counter (`spec.md` §3/§7).
//!
//! The original source increments a plain `uint64_t` with no synchronization;
//! per `DESIGN NOTES` §9 this becomes an atomic.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct ErrorCounter(AtomicU64);

impl ErrorCounter {
    pub fn new() -> ErrorCounter {
        ErrorCounter(AtomicU64::new(0))
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_is_monotonically_non_decreasing() {
        let counter = ErrorCounter::new();
        assert_eq!(counter.get(), 0);
        counter.increment();
        counter.increment();
        assert_eq!(counter.get(), 2);
    }
}
