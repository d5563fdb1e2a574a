//! Logical-time cadence gates for the cooperative loop.
//!
//! Both timers are fed an externally supplied millisecond timestamp instead
//! of reading a clock, which keeps every cadence-driven policy (config
//! dirty-check, bus reconnect delay, info publish) deterministic under test.

/// Fires once every `interval_ms` of logical time.
#[derive(Debug, Default)]
pub struct CycleTimer {
    last: Option<u64>,
}

impl CycleTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when `interval_ms` has elapsed since the last fire.
    /// The first call arms the timer and does not fire.
    pub fn cycle_trigger(&mut self, now_ms: u64, interval_ms: u64) -> bool {
        match self.last {
            None => {
                self.last = Some(now_ms);
                false
            }
            Some(last) if now_ms.wrapping_sub(last) >= interval_ms => {
                self.last = Some(now_ms);
                true
            }
            Some(_) => false,
        }
    }
}

/// One-shot delay: fires once `delay_ms` after first being enabled,
/// then stays latched until [`reset`](DelayTimer::reset).
#[derive(Debug, Default)]
pub struct DelayTimer {
    armed_at: Option<u64>,
    fired: bool,
}

impl DelayTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// While `enable` is true, returns `true` exactly once, `delay_ms`
    /// after the first enabled call.  Passing `enable = false` disarms.
    pub fn delay_on_trigger(&mut self, enable: bool, now_ms: u64, delay_ms: u64) -> bool {
        if !enable {
            self.armed_at = None;
            self.fired = false;
            return false;
        }
        match self.armed_at {
            None => {
                self.armed_at = Some(now_ms);
                false
            }
            Some(t0) if !self.fired && now_ms.wrapping_sub(t0) >= delay_ms => {
                self.fired = true;
                true
            }
            Some(_) => false,
        }
    }

    /// Disarm so the next enabled call starts a fresh delay.
    pub fn reset(&mut self) {
        self.armed_at = None;
        self.fired = false;
    }
}
