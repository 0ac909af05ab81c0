//! Optional metrics instrumentation for strata.
//!
//! When the `observe` feature is enabled, key operations emit counters
//! and histograms via the [`metrics`] crate. A downstream application
//! must install a metrics recorder to collect the data.
//!
//! When the feature is **not** enabled every function in this module is
//! a zero-cost no-op.

/// Record an append (events accepted into a stream).
///
/// - `strata.store.events_appended_total` – incremented per event
#[inline]
pub fn record_append(events: usize) {
    #[cfg(feature = "observe")]
    {
        metrics::counter!("strata.store.events_appended_total").increment(events as u64);
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = events;
    }
}

/// Record a stream load (counter + latency histogram).
///
/// - `strata.store.loads_total` – incremented on every load
/// - `strata.store.load_duration_seconds` – histogram of load latency
#[inline]
pub fn record_load(duration: std::time::Duration) {
    #[cfg(feature = "observe")]
    {
        metrics::counter!("strata.store.loads_total").increment(1);
        metrics::histogram!("strata.store.load_duration_seconds").record(duration.as_secs_f64());
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = duration;
    }
}

/// Record one projection tick.
///
/// - `strata.projection.events_processed_total` – counter
/// - `strata.projection.tick_duration_seconds` – histogram
#[inline]
pub fn record_tick(events: usize, duration: std::time::Duration) {
    #[cfg(feature = "observe")]
    {
        metrics::counter!("strata.projection.events_processed_total").increment(events as u64);
        metrics::histogram!("strata.projection.tick_duration_seconds")
            .record(duration.as_secs_f64());
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = (events, duration);
    }
}
