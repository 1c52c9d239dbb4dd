//! Self-rearming "time ago" timers.
//!
//! A timer is plain data: when it is due and how often it has fired. The
//! owner polls [`TimerSet::fire_due`] from its tick loop and refreshes the
//! text of every key returned. Arming a key again replaces its timer, so a
//! fresh render never leaves a second timer behind for the same card.

use std::collections::HashMap;
use std::hash::Hash;

/// Refresh spacing after the `fired`-th fire.
///
/// Every second for the first minute, every minute for the next hour's worth
/// of fires, then hourly.
pub fn delay_after(fired: u32) -> f64 {
    if fired < 60 {
        1.0
    } else if fired < 120 {
        60.0
    } else {
        3600.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAgoTimer {
    fired: u32,
    due_at: f64,
}

impl TimeAgoTimer {
    /// A timer that first fires one second after `now`.
    pub fn armed(now: f64) -> Self {
        Self {
            fired: 0,
            due_at: now + delay_after(0),
        }
    }

    pub fn fired(&self) -> u32 {
        self.fired
    }

    pub fn due_at(&self) -> f64 {
        self.due_at
    }

    pub fn is_due(&self, now: f64) -> bool {
        now >= self.due_at
    }

    /// Record a fire at `now` and schedule the next one.
    fn fire(&mut self, now: f64) {
        self.fired = self.fired.saturating_add(1);
        self.due_at = now + delay_after(self.fired);
    }
}

/// Timers keyed by card (or host panel) id.
#[derive(Debug, Clone)]
pub struct TimerSet<K> {
    timers: HashMap<K, TimeAgoTimer>,
}

impl<K> Default for TimerSet<K> {
    fn default() -> Self {
        Self {
            timers: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> TimerSet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a fresh timer for `key`, returning the one it replaced.
    pub fn arm(&mut self, key: K, now: f64) -> Option<TimeAgoTimer> {
        self.timers.insert(key, TimeAgoTimer::armed(now))
    }

    pub fn cancel(&mut self, key: &K) -> Option<TimeAgoTimer> {
        self.timers.remove(key)
    }

    pub fn get(&self, key: &K) -> Option<&TimeAgoTimer> {
        self.timers.get(key)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Fire every timer due at `now` once and re-arm it. Returns the keys fired.
    pub fn fire_due(&mut self, now: f64) -> Vec<K> {
        let mut fired = Vec::new();
        for (key, timer) in self.timers.iter_mut() {
            if timer.is_due(now) {
                timer.fire(now);
                fired.push(key.clone());
            }
        }
        fired
    }

    /// Earliest pending due instant, if any timer is armed.
    pub fn next_due(&self) -> Option<f64> {
        self.timers
            .values()
            .map(TimeAgoTimer::due_at)
            .min_by(|a, b| a.total_cmp(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_schedule() {
        assert_eq!(delay_after(0), 1.0);
        assert_eq!(delay_after(59), 1.0);
        assert_eq!(delay_after(60), 60.0);
        assert_eq!(delay_after(119), 60.0);
        assert_eq!(delay_after(120), 3600.0);
        assert_eq!(delay_after(10_000), 3600.0);
    }

    #[test]
    fn test_spacing_over_many_fires() {
        let mut set = TimerSet::new();
        let mut now = 0.0;
        set.arm("card-a", now);
        let mut gaps = Vec::new();
        for _ in 0..125 {
            let due = set.next_due().unwrap();
            gaps.push(due - now);
            now = due;
            assert_eq!(set.fire_due(now), vec!["card-a"]);
        }
        // first fire at +1s, then 59 more 1s gaps
        assert!(gaps[..60].iter().all(|g| *g == 1.0));
        assert!(gaps[60..120].iter().all(|g| *g == 60.0));
        assert!(gaps[120..].iter().all(|g| *g == 3600.0));
        assert_eq!(set.get(&"card-a").unwrap().fired(), 125);
    }

    #[test]
    fn test_rearm_replaces() {
        let mut set = TimerSet::new();
        set.arm("card-a", 0.0);
        set.fire_due(1.0);
        set.fire_due(2.0);
        let old = set.arm("card-a", 100.0).unwrap();
        assert_eq!(old.fired(), 2);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(&"card-a").unwrap().fired(), 0);
        assert_eq!(set.next_due(), Some(101.0));
    }

    #[test]
    fn test_only_due_timers_fire() {
        let mut set = TimerSet::new();
        set.arm("a", 0.0);
        set.arm("b", 10.0);
        assert_eq!(set.fire_due(1.5), vec!["a"]);
        assert!(set.fire_due(1.6).is_empty());
        set.cancel(&"a");
        assert_eq!(set.next_due(), Some(11.0));
        assert!(TimerSet::<String>::new().next_due().is_none());
    }
}
