use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    polls: AtomicU64,
    poll_failures: AtomicU64,
    mobs_seen: AtomicU64,
    new_mobs: AtomicU64,
    alerts: AtomicU64,
    notices: AtomicU64,
    sink_failures: AtomicU64,
}

impl Metrics {
    pub fn record_poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll_failure(&self) {
        self.poll_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot(&self, mob_count: usize, new_count: usize) {
        self.mobs_seen.fetch_add(mob_count as u64, Ordering::Relaxed);
        self.new_mobs.fetch_add(new_count as u64, Ordering::Relaxed);
    }

    pub fn record_alert(&self) {
        self.alerts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notice(&self) {
        self.notices.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sink_failures(&self, count: usize) {
        self.sink_failures.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn alerts(&self) -> u64 {
        self.alerts.load(Ordering::Relaxed)
    }

    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    pub fn poll_failures(&self) -> u64 {
        self.poll_failures.load(Ordering::Relaxed)
    }

    pub fn render_summary(&self) -> String {
        format!(
            "polls={} poll_failures={} mobs_seen={} new_mobs={} alerts={} notices={} sink_failures={}",
            self.polls.load(Ordering::Relaxed),
            self.poll_failures.load(Ordering::Relaxed),
            self.mobs_seen.load(Ordering::Relaxed),
            self.new_mobs.load(Ordering::Relaxed),
            self.alerts.load(Ordering::Relaxed),
            self.notices.load(Ordering::Relaxed),
            self.sink_failures.load(Ordering::Relaxed),
        )
    }
}
