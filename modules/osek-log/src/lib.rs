//! Logging macros for the OSEK kernel crates
//!
//! Every macro wraps the `defmt` crate. With the `log-base` feature the
//! messages go out through `defmt-rtt`; without it the macros expand to
//! nothing and their arguments are never evaluated.
//!
//! The per-subsystem macros (`os_log!`, `queue_log!`, ...) are switched on
//! one by one so that the queue layer can be traced without drowning in
//! cpu-load samples.

#![cfg_attr(not(test), no_std)]

#[cfg(feature = "log-base")]
use defmt_rtt as _;

#[cfg(feature = "log-base")]
#[doc(hidden)]
pub use defmt as __defmt;

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::__log!(trace, $($arg)*) };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::__log!(debug, $($arg)*) };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::__log!(info, $($arg)*) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::__log!(warn, $($arg)*) };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::__log!(error, $($arg)*) };
}

#[cfg(feature = "log-base")]
#[doc(hidden)]
#[macro_export]
macro_rules! __log {
    ($level:ident, $($arg:tt)*) => {
        $crate::__defmt::$level!($($arg)*)
    };
}

#[cfg(not(feature = "log-base"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __log {
    ($level:ident, $($arg:tt)*) => {};
}

// kernel startup, panics, hooks
#[cfg(feature = "log-os")]
#[macro_export]
macro_rules! os_log {
    ($level:ident, $($args:tt)*) => { $crate::$level!($($args)*); };
}

#[cfg(not(feature = "log-os"))]
#[macro_export]
macro_rules! os_log {
    ($level:ident, $($args:tt)*) => {};
}

// priority queues and bitwords
#[cfg(feature = "log-queue")]
#[macro_export]
macro_rules! queue_log {
    ($level:ident, $($args:tt)*) => { $crate::$level!($($args)*); };
}

#[cfg(not(feature = "log-queue"))]
#[macro_export]
macro_rules! queue_log {
    ($level:ident, $($args:tt)*) => {};
}

// startup consistency checks
#[cfg(feature = "log-check")]
#[macro_export]
macro_rules! check_log {
    ($level:ident, $($args:tt)*) => { $crate::$level!($($args)*); };
}

#[cfg(not(feature = "log-check"))]
#[macro_export]
macro_rules! check_log {
    ($level:ident, $($args:tt)*) => {};
}

// cpu load measurement
#[cfg(feature = "log-cpuload")]
#[macro_export]
macro_rules! cpuload_log {
    ($level:ident, $($args:tt)*) => { $crate::$level!($($args)*); };
}

#[cfg(not(feature = "log-cpuload"))]
#[macro_export]
macro_rules! cpuload_log {
    ($level:ident, $($args:tt)*) => {};
}

// events, resources and task services
#[cfg(feature = "log-event")]
#[macro_export]
macro_rules! event_log {
    ($level:ident, $($args:tt)*) => { $crate::$level!($($args)*); };
}

#[cfg(not(feature = "log-event"))]
#[macro_export]
macro_rules! event_log {
    ($level:ident, $($args:tt)*) => {};
}
