use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    resolutions: AtomicU64,
    store_failures: AtomicU64,
    boundary_checks: AtomicU64,
    boundary_violations: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_resolution(&self) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_boundary_check(&self, is_valid: bool) {
        self.boundary_checks.fetch_add(1, Ordering::Relaxed);
        if !is_valid {
            self.boundary_violations.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    pub fn store_failures(&self) -> u64 {
        self.store_failures.load(Ordering::Relaxed)
    }

    pub fn boundary_checks(&self) -> u64 {
        self.boundary_checks.load(Ordering::Relaxed)
    }

    pub fn boundary_violations(&self) -> u64 {
        self.boundary_violations.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn render_prometheus(&self) -> String {
        let counters = [
            ("warden_resolutions_total", "Abilities resolved.", self.resolutions()),
            (
                "warden_store_failures_total",
                "Resolutions aborted by a store failure.",
                self.store_failures(),
            ),
            (
                "warden_boundary_checks_total",
                "Privilege boundary checks performed.",
                self.boundary_checks(),
            ),
            (
                "warden_boundary_violations_total",
                "Boundary checks that found missing permissions.",
                self.boundary_violations(),
            ),
            ("warden_cache_hits_total", "Assignment cache hits.", self.cache_hits()),
            ("warden_cache_misses_total", "Assignment cache misses.", self.cache_misses()),
        ];

        let mut output = String::new();
        for (name, help, value) in counters {
            let _ = writeln!(output, "# HELP {name} {help}");
            let _ = writeln!(output, "# TYPE {name} counter");
            let _ = writeln!(output, "{name} {value}");
        }
        output
    }
}
