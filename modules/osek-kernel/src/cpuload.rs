//! CPU load measurement.
//!
//! The core is busy from the moment it leaves the idle loop until it returns
//! to it. Busy bursts are summed per interval; the last `n_intervals`
//! interval sums form a ring buffer whose running total is the busy time of
//! the window the load is computed over.
//!
//! Everything here runs with interrupts locked on the core that owns the
//! measurement. Other cores ask for the load through the message queue.

use alloc::boxed::Box;
use alloc::vec::Vec;

use osek_cfg::{CpuLoadConfig, OS_COREID, OS_CPULOAD_INVALID, OsError};
use osek_structs::cell::KernelCell;

use crate::message::OsMessage;
use crate::{OsCore, OsService};

/// Which figure `GetCpuLoad` reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CpuLoadKind {
    /// load over the current window
    Current,
    /// highest load seen since the last reset
    Peak,
    /// the peak, which then restarts from the current load
    PeakAndReset,
}

/// The measurement state of one core.
pub struct OsCpuLoad {
    cfg: CpuLoadConfig,
    /// when the current busy burst (or its not yet accounted part) began
    idle_exit_time: KernelCell<u64>,
    /// 0 while idle; nested busy sources (task, ISRs) count up
    busy_nesting_counter: KernelCell<u8>,
    interval_start: KernelCell<u64>,
    /// busy ticks of the running interval
    busy_time: KernelCell<u32>,
    busy_time_sum: KernelCell<u32>,
    busy_buffer: Box<[KernelCell<u32>]>,
    busy_index: KernelCell<u16>,
    current_load: KernelCell<u8>,
    peak_load: KernelCell<u8>,
}

impl OsCpuLoad {
    pub(crate) fn new(cfg: CpuLoadConfig) -> Self {
        let buffer: Vec<KernelCell<u32>> =
            (0..cfg.n_intervals).map(|_| KernelCell::new(0)).collect();
        Self {
            cfg,
            idle_exit_time: KernelCell::new(0),
            busy_nesting_counter: KernelCell::new(0),
            interval_start: KernelCell::new(0),
            busy_time: KernelCell::new(0),
            busy_time_sum: KernelCell::new(0),
            busy_buffer: buffer.into_boxed_slice(),
            busy_index: KernelCell::new(0),
            current_load: KernelCell::new(0),
            peak_load: KernelCell::new(0),
        }
    }

    /// Whether `cfg` describes a measurement that can run at all
    pub(crate) fn usable(cfg: &CpuLoadConfig) -> bool {
        cfg.is_valid()
    }

    pub fn config(&self) -> &CpuLoadConfig {
        &self.cfg
    }

    /// Start measuring at `now` with the core idle.
    pub fn init(&self, now: u64) {
        self.idle_exit_time.set(now);
        self.busy_nesting_counter.set(0);
        self.interval_start.set(now);
        self.busy_time.set(0);
        self.busy_time_sum.set(0);
        for slot in self.busy_buffer.iter() {
            slot.set(0);
        }
        self.busy_index.set(0);
        self.current_load.set(0);
        self.peak_load.set(0);
        cpuload_log!(debug, "cpu load measurement started at {}", now);
    }

    /// The core starts doing something. Only the outermost transition out
    /// of idle starts a busy burst.
    pub fn leave_idle_state(&self, now: u64) {
        let nesting = self.busy_nesting_counter.get();
        if nesting == 0 {
            self.measure_cpu_load(now);
            self.idle_exit_time.set(now);
        }
        self.busy_nesting_counter.set(nesting.saturating_add(1));
    }

    /// One busy source is done. When the last one goes the burst is
    /// accounted and the core is idle again.
    pub fn enter_idle_state(&self, now: u64) {
        match self.busy_nesting_counter.get() {
            0 => {}
            1 => {
                self.measure_cpu_load(now);
                self.busy_nesting_counter.set(0);
            }
            n => self.busy_nesting_counter.set(n - 1),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy_nesting_counter.get() != 0
    }

    /// Bring the measurement up to `now`.
    ///
    /// Every interval boundary passed since the last call closes an interval:
    /// the part of a running busy burst before the boundary is booked to the
    /// closing interval, the rest to the next one. If the core is busy, the
    /// burst up to `now` is booked and the burst restarts at `now`.
    pub fn measure_cpu_load(&self, now: u64) {
        let busy = self.is_busy();
        let interval = self.cfg.interval_duration as u64;
        let mut start = self.interval_start.get();
        let since = self.idle_exit_time.get();

        if now < start {
            return;
        }
        let elapsed = (now - start) / interval;
        if elapsed > self.cfg.n_intervals as u64 {
            // the whole window lies in the gap: every slot is either fully
            // idle or fully busy, whatever the running interval held
            self.fill_window(busy);
            start += elapsed * interval;
            self.interval_start.set(start);
            self.busy_time.set(0);
            if busy {
                self.busy_time.set((now - start) as u32);
                self.idle_exit_time.set(now);
            }
            return;
        }

        for _ in 0..elapsed {
            let boundary = start + interval;
            if busy {
                let from = since.max(start);
                let booked = boundary.saturating_sub(from) as u32;
                self.busy_time.with_mut(|t| *t = t.saturating_add(booked));
            }
            self.close_interval();
            start = boundary;
        }
        self.interval_start.set(start);

        if busy {
            let booked = now.saturating_sub(since.max(start)) as u32;
            self.busy_time.with_mut(|t| *t = t.saturating_add(booked));
            self.idle_exit_time.set(now);
        }
    }

    fn fill_window(&self, busy: bool) {
        let per_interval = if busy { self.cfg.interval_duration } else { 0 };
        for slot in self.busy_buffer.iter() {
            slot.set(per_interval);
        }
        let sum = if busy { self.cfg.window_duration } else { 0 };
        self.busy_time_sum.set(sum);
        let load = self.cfg.percentage(sum);
        self.current_load.set(load);
        if load > self.peak_load.get() {
            self.peak_load.set(load);
        }
        cpuload_log!(trace, "window skipped: load {}", load);
    }

    fn close_interval(&self) {
        let busy = self.busy_time.replace(0).min(self.cfg.interval_duration);
        let index = self.busy_index.get();
        let old = self.busy_buffer[index as usize].replace(busy);
        let sum = self.busy_time_sum.get() - old + busy;
        self.busy_time_sum.set(sum);
        self.busy_index.set((index + 1) % self.cfg.n_intervals);

        let load = self.cfg.percentage(sum);
        self.current_load.set(load);
        if load > self.peak_load.get() {
            self.peak_load.set(load);
        }
        cpuload_log!(trace, "interval closed: busy {} sum {} load {}", busy, sum, load);
    }

    pub fn current_load(&self) -> u8 {
        self.current_load.get()
    }

    pub fn peak_load(&self) -> u8 {
        self.peak_load.get()
    }

    pub fn busy_time_sum(&self) -> u32 {
        self.busy_time_sum.get()
    }

    pub fn get(&self, kind: CpuLoadKind) -> u8 {
        match kind {
            CpuLoadKind::Current => self.current_load.get(),
            CpuLoadKind::Peak => self.peak_load.get(),
            CpuLoadKind::PeakAndReset => self.peak_load.replace(self.current_load.get()),
        }
    }
}

impl OsCore<'_, '_> {
    /// `GetCpuLoad`: load of core `target` in percent, or
    /// `OS_CPULOAD_INVALID` if that core does not measure it.
    ///
    /// Another core's load is measured by that core, on request through its
    /// inbox. Must not be called with interrupts locked.
    pub fn get_cpu_load(&self, target: OS_COREID, kind: CpuLoadKind) -> Result<u8, OsError> {
        self.query_cpu_load(target, kind)
            .map_err(|e| self.report_error(OsService::GetCpuLoad, e))
    }

    fn query_cpu_load(&self, target: OS_COREID, kind: CpuLoadKind) -> Result<u8, OsError> {
        let target_kd = self.kernel.core_data(target).ok_or(OsError::E_OS_ID)?;
        if target_kd.cpu_load.is_none() {
            return Ok(OS_CPULOAD_INVALID);
        }
        if target == self.id() {
            return Ok(self.measure_local(kind));
        }
        let load = self.send_message_wait(target, OsMessage::MeasureCpuLoad(kind))?;
        Ok(load as u8)
    }

    /// Load of this core, measured up to now.
    pub(crate) fn measure_local(&self, kind: CpuLoadKind) -> u8 {
        let Some(load) = self.kd.cpu_load.as_ref() else {
            return OS_CPULOAD_INVALID;
        };
        let now = self.kernel.platform.timestamp();
        critical_section::with(|_| {
            load.measure_cpu_load(now);
            load.get(kind)
        })
    }
}
