/// Parameters of a core's cpu-load measurement.
///
/// The load is the busy share of a sliding window of `n_intervals`
/// intervals, each `interval_duration` timestamp ticks long. The derived
/// values are computed once, here, so that the measurement itself only adds,
/// multiplies by 100 and divides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuLoadConfig {
    pub interval_duration: u32,
    pub n_intervals: u16,
    pub window_duration: u32,
    /// `window_duration / 100`, the divisor when `busy * 100` would overflow
    pub window_duration_100: u32,
    pub rounding: u32,
    pub rounding_100: u32,
    /// largest busy sum for which `busy * 100 + rounding` fits in 32 bits
    pub busy_overflow_limit: u32,
}

impl CpuLoadConfig {
    /// A window that does not fit in 32 bits leaves `window_duration` at 0,
    /// which [`is_valid`](Self::is_valid) rejects.
    pub const fn new(interval_duration: u32, n_intervals: u16) -> Self {
        let window_duration = match interval_duration.checked_mul(n_intervals as u32) {
            Some(window) => window,
            None => 0,
        };
        let window_duration_100 = window_duration / 100;
        let rounding = window_duration / 2;
        Self {
            interval_duration,
            n_intervals,
            window_duration,
            window_duration_100,
            rounding,
            rounding_100: window_duration_100 / 2,
            busy_overflow_limit: (u32::MAX - rounding) / 100,
        }
    }

    /// Whether the measurement can run with these parameters
    pub const fn is_valid(&self) -> bool {
        self.interval_duration != 0 && self.n_intervals != 0 && self.window_duration != 0
    }

    /// Load in percent for `busy` ticks of the window.
    pub const fn percentage(&self, busy: u32) -> u8 {
        if self.window_duration == 0 {
            return 0;
        }
        let load = if busy > self.busy_overflow_limit {
            (busy + self.rounding_100) / self.window_duration_100
        } else {
            (busy * 100 + self.rounding) / self.window_duration
        };
        if load > 100 { 100 } else { load as u8 }
    }
}

#[cfg(test)]
mod tests {
    use super::CpuLoadConfig;

    #[test]
    fn percentage_rounds_to_nearest() {
        let cfg = CpuLoadConfig::new(1000, 10);
        assert_eq!(cfg.percentage(0), 0);
        assert_eq!(cfg.percentage(10_000), 100);
        assert_eq!(cfg.percentage(3_349), 33);
        assert_eq!(cfg.percentage(3_350), 34);
    }

    #[test]
    fn window_beyond_32_bits_is_invalid() {
        let cfg = CpuLoadConfig::new(1_000_000_000, 5);
        assert_eq!(cfg.window_duration, 0);
        assert!(!cfg.is_valid());
        assert_eq!(cfg.percentage(1_000), 0);
        assert!(!CpuLoadConfig::new(0, 10).is_valid());
        assert!(!CpuLoadConfig::new(100, 0).is_valid());
        assert!(CpuLoadConfig::new(u32::MAX, 1).is_valid());
    }

    #[test]
    fn large_windows_take_the_overflow_path() {
        // 4e9 ticks: busy * 100 does not fit in 32 bits
        let cfg = CpuLoadConfig::new(400_000_000, 10);
        assert!(cfg.busy_overflow_limit < 2_000_000_000);
        assert_eq!(cfg.percentage(2_000_000_000), 50);
        assert_eq!(cfg.percentage(4_000_000_000), 100);
    }
}
