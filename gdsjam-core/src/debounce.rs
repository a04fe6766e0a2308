/// Coalesces bursts of requests into a single emission once an interval has
/// elapsed, keeping only the latest payload (spec.md §4.3's 100 ms culling /
/// 50 ms grid-and-scale-bar debounce). Pure and host-testable: the caller
/// supplies timestamps (e.g. from `web_time::Instant` or
/// `Performance::now()`) rather than the debouncer owning a real timer.
pub struct Debouncer<T> {
    interval_ms: f64,
    pending: Option<T>,
    last_emitted_at: Option<f64>,
}

impl<T> Debouncer<T> {
    pub fn new(interval_ms: f64) -> Self {
        Self { interval_ms, pending: None, last_emitted_at: None }
    }

    /// Records a request, overwriting any still-pending one — the latest
    /// request always wins.
    pub fn request(&mut self, payload: T) {
        self.pending = Some(payload);
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Emits the pending payload if `interval_ms` has elapsed since the last
    /// emission (or none has happened yet). Returns `None` without
    /// consuming the pending payload if the interval hasn't elapsed.
    pub fn poll(&mut self, now_ms: f64) -> Option<T> {
        self.pending.as_ref()?;
        let ready = match self.last_emitted_at {
            None => true,
            Some(last) => now_ms - last >= self.interval_ms,
        };
        if !ready {
            return None;
        }
        self.last_emitted_at = Some(now_ms);
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesces_bursts_into_one_emission() {
        let mut d = Debouncer::new(100.0);
        d.request(1);
        d.request(2);
        d.request(3);
        assert_eq!(d.poll(0.0), Some(3));
        assert_eq!(d.poll(0.0), None);
    }

    #[test]
    fn withholds_until_interval_elapses() {
        let mut d = Debouncer::new(100.0);
        d.request("a");
        assert_eq!(d.poll(0.0), Some("a"));
        d.request("b");
        assert_eq!(d.poll(50.0), None, "interval hasn't elapsed");
        assert_eq!(d.poll(100.0), Some("b"));
    }

    #[test]
    fn empty_debouncer_emits_nothing() {
        let mut d: Debouncer<()> = Debouncer::new(50.0);
        assert_eq!(d.poll(1000.0), None);
    }
}
