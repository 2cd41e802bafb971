//! Progress mapping and weighted combination

use std::sync::{Arc, Mutex};

/// Shared progress callback taking a whole percentage
pub type ProgressCallback = Arc<dyn Fn(u32) + Send + Sync>;

/// Wrap a closure as a shareable progress callback
pub fn progress_fn<F>(f: F) -> ProgressCallback
where
    F: Fn(u32) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A callback that discards all reports
pub fn noop_progress() -> ProgressCallback {
    Arc::new(|_| {})
}

/// Map a 0..=100 percentage into the `[start, end]` sub-range
///
/// Monotonic in `percent`, with `map_progress(0, s, e) == s` and
/// `map_progress(100, s, e) == e`.
pub fn map_progress(percent: u32, start: u32, end: u32) -> u32 {
    let percent = percent.min(100);
    let span = end.saturating_sub(start) as f64;
    start + (percent as f64 * span / 100.0).round() as u32
}

/// Combines N equally weighted sub-items into one non-regressing
/// percentage stream
///
/// Each item owns `100/N` of the total; items may report out of order and
/// the combined value never moves backwards.
pub struct ProgressContext {
    callback: ProgressCallback,
    inner: Mutex<Inner>,
}

struct Inner {
    items: Vec<u32>,
    last_reported: u32,
}

impl ProgressContext {
    pub fn new(item_count: usize, callback: ProgressCallback) -> Self {
        Self {
            callback,
            inner: Mutex::new(Inner {
                items: vec![0; item_count],
                last_reported: 0,
            }),
        }
    }

    /// Report one item's own 0..=100 progress
    pub fn report_item(&self, index: usize, percent: u32) {
        let combined = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            if index >= inner.items.len() {
                return;
            }
            let percent = percent.min(100);
            if percent > inner.items[index] {
                inner.items[index] = percent;
            }
            let count = inner.items.len() as f64;
            let total: u32 = (inner.items.iter().map(|p| *p as f64).sum::<f64>() / count)
                .round() as u32;
            if total <= inner.last_reported {
                return;
            }
            inner.last_reported = total;
            total
        };
        (self.callback)(combined);
    }

    /// Mark one item complete
    pub fn finish_item(&self, index: usize) {
        self.report_item(index, 100);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn map_progress_hits_the_endpoints() {
        assert_eq!(map_progress(0, 40, 80), 40);
        assert_eq!(map_progress(100, 40, 80), 80);
        assert_eq!(map_progress(50, 40, 80), 60);
        assert_eq!(map_progress(55, 0, 25), 14);
        // Over-reports clamp to the end of the range.
        assert_eq!(map_progress(150, 0, 40), 40);
    }

    #[test]
    fn map_progress_is_monotonic() {
        for (start, end) in [(0, 3), (3, 30), (30, 100), (98, 100)] {
            let mut last = 0;
            for percent in 0..=100 {
                let mapped = map_progress(percent, start, end);
                assert!(mapped >= last, "regressed at {percent} in [{start},{end}]");
                assert!((start..=end).contains(&mapped));
                last = mapped;
            }
        }
    }

    #[test]
    fn context_combines_out_of_order_items_without_regressing() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let ctx = ProgressContext::new(4, progress_fn(move |p| {
            sink.lock().unwrap().push(p);
        }));

        ctx.report_item(2, 100);
        ctx.report_item(0, 50);
        // Stale report for an already-complete item changes nothing.
        ctx.report_item(2, 10);
        ctx.report_item(1, 100);
        ctx.report_item(0, 100);
        ctx.finish_item(3);

        let seen = seen.lock().unwrap();
        assert_eq!(*seen.last().unwrap(), 100);
        for pair in seen.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn duplicate_reports_are_suppressed() {
        let count = Arc::new(AtomicU32::new(0));
        let sink = count.clone();
        let ctx = ProgressContext::new(1, progress_fn(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        }));
        ctx.report_item(0, 30);
        ctx.report_item(0, 30);
        ctx.report_item(0, 30);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
