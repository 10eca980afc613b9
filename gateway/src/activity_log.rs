//! Thread-safe tally of which (app_key, dev_id) pairs the gateway has served
//! since the last telemetry tick (`spec.md` §4.3).
//!
//! Backed by a `hashbrown::HashMap` under its own mutex, disjoint from the
//! database mutex (`spec.md` §3 invariant) — generalized from the teacher's
//! linked-list-under-a-global-mutex design per `DESIGN NOTES` §9.

use std::sync::Mutex;

use gw_protocol::{AppKey, DevId};
use hashbrown::HashMap;
use serde::Serialize;

#[derive(Debug, Serialize, Eq, PartialEq)]
struct ActivityEntry {
    app_key: String,
    dev_id: DevId,
    count: u64,
}

pub struct ActivityLog {
    entries: Mutex<HashMap<(AppKey, DevId), u64>>,
}

impl ActivityLog {
    pub fn new() -> ActivityLog {
        ActivityLog {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Increments (or inserts with count 1) the tally for `(app_key, dev_id)`.
    pub fn add(&self, app_key: AppKey, dev_id: DevId) {
        let mut guard = self.entries.lock().expect("activity log mutex poisoned");
        *guard.entry((app_key, dev_id)).or_insert(0) += 1;
    }

    /// Serializes all entries to a JSON array and clears the log. The
    /// specific shape is an external contract with the platform, but must
    /// delimit entries unambiguously — JSON satisfies that (`spec.md` §4.3).
    pub fn flush(&self) -> String {
        let mut guard = self.entries.lock().expect("activity log mutex poisoned");
        let report: Vec<ActivityEntry> = guard
            .drain()
            .map(|((app_key, dev_id), count)| ActivityEntry {
                app_key: app_key.display(),
                dev_id,
                count,
            })
            .collect();
        serde_json::to_string(&report).expect("activity log entries are always serializable")
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &[u8; 8]) -> AppKey {
        AppKey(*s)
    }

    #[test]
    fn add_increments_existing_entry() {
        let log = ActivityLog::new();
        log.add(key(b"APP00001"), 1);
        log.add(key(b"APP00001"), 1);
        log.add(key(b"APP00001"), 2);

        let report = log.flush();
        let parsed: serde_json::Value = serde_json::from_str(&report).unwrap();
        let total: u64 = parsed
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["count"].as_u64().unwrap())
            .sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn flush_empties_the_log() {
        let log = ActivityLog::new();
        log.add(key(b"APP00001"), 1);
        let _ = log.flush();
        let second = log.flush();
        assert_eq!(second, "[]");
    }

    #[test]
    fn flush_round_trips_through_json() {
        let log = ActivityLog::new();
        for _ in 0..5 {
            log.add(key(b"APP00001"), 1);
        }
        for _ in 0..3 {
            log.add(key(b"APP00002"), 7);
        }
        let report = log.flush();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&report).unwrap();
        let total: u64 = parsed.iter().map(|e| e["count"].as_u64().unwrap()).sum();
        assert_eq!(total, 8);
        assert_eq!(parsed.len(), 2);
    }
}
