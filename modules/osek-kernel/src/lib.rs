#![cfg_attr(not(test), no_std)]
#![allow(non_snake_case)]

//! The per-core scheduler core of the OSEK kernel.
//!
//! Every core owns one [`KernelData`]: its priority bitword, the slot arena
//! all its priority queues live in, the circular-buffer indices of the
//! multi-slot queues, its cpu-load state and its inter-core inbox. The
//! [`Kernel`] owns one `KernelData` per configured core plus the dynamic part
//! of every task and resource, and hands out [`OsCore`] handles through which
//! the services run.
//!
//! Code running on a core only ever touches that core's data. Anything that
//! has to happen on another core is sent there as a message.

extern crate alloc;

#[macro_use]
extern crate osek_log;

mod bitword;
mod cpuload;
mod dequeue_all;
mod error;
mod event;
mod kernel;
mod kernel_data;
mod lock;
mod message;
mod queue;
mod resource;
mod startup;
mod startup_checks;
mod task;

pub use cpuload::{CpuLoadKind, OsCpuLoad};
pub use error::OsService;
pub use kernel::{Kernel, OsCore, OsResourceDynamic, OsTaskDynamic};
pub use kernel_data::{KernelData, OsContext};
pub use lock::IntLock;
pub use message::{OS_MESSAGE_QUEUE_LEN, OsMessage};
pub use startup::{OSStartOs, OSStartupChecksQueue};
pub use startup_checks::startup_checks_queue;

pub use osek_cfg as cfg;
pub use osek_platform::Platform;
