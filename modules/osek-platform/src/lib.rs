#![cfg_attr(not(test), no_std)]

//! Platform abstraction for the OSEK kernel
//!
//! The kernel needs very little from the hardware: which core it runs on, a
//! free-running timestamp for the cpu-load measurement, and somewhere to go
//! when it panics. Interrupt locking is done through `critical_section`,
//! which each platform implements.
//!
//! ## Platforms
//!
//! - [`sim`]: a simulated timer and platform for hosted builds and tests
//! - `cortex_m`: single-core Cortex-M (feature `cortex-m`)

#[macro_use]
extern crate osek_log;

pub mod sim;
pub mod traits;

#[cfg(feature = "cortex-m")]
pub mod cortex_m;

pub use traits::Platform;
