#![cfg_attr(not(test), no_std)]
#![allow(non_camel_case_types)]
#![allow(non_upper_case_globals)]
#![allow(non_snake_case)]

//! Configuration of the OSEK kernel.
//!
//! Everything in here is what the build-time generator emits for one ECU:
//! the task and resource tables, the per-core priority queue geometry and the
//! cpu-load parameters. The kernel treats all of it as read-only input and
//! `osek-kernel`'s startup checks validate it before the first dispatch.

#[cfg(feature = "generator")]
extern crate alloc;

mod config;
mod cpuload;
mod error;
mod queue;
mod resource;
mod task;

#[cfg(feature = "generator")]
pub mod generator;

pub use config::*;
pub use cpuload::CpuLoadConfig;
pub use error::{OsError, OsPanic, ProtectionAction};
pub use queue::{OsPriorityQueue, PriorityQueueDynamic};
pub use resource::OsResource;
pub use task::{OsTask, OsTaskState, TaskFlags};

/*
*********************************************************************************************************
*                                              TYPES
*********************************************************************************************************
*/

/// Task and resource priority. Covers all task priorities plus the
/// interrupt priorities above them.
pub type OS_PRIO = u16;
/// A priority that only a task can take.
pub type OS_TASKPRIO = u8;
pub type OS_TASKID = u16;
pub type OS_RESOURCEID = u16;
pub type OS_APPID = u8;
pub type OS_COREID = u8;
/// Activation counter
pub type OS_ACT = u8;
/// Index into a core's priority slot arena
pub type OS_TASKLINK = u16;
/// The word the CLZ bitword is made of
pub type OS_CLZWORD = u32;
pub type OS_EVENTMASK = u32;

/*
*********************************************************************************************************
*                                            CONSTANTS
*********************************************************************************************************
*/

/// Maximum number of cores a configuration can describe
pub const OS_N_CORES_MAX: usize = 4;

/// Empty queue slot / no task
pub const OS_NULLTASK: OS_TASKID = 0xFFFF;
pub const OS_NULLRESOURCE: OS_RESOURCEID = 0xFFFF;
pub const OS_NULLAPP: OS_APPID = 0xFF;

/// Highest priority a task can ever be given
pub const OS_MAXPOSSIBLETASKPRIO: OS_PRIO = 0xff;
/// Lowest interrupt priority. Resource ceilings at or above this lock ISRs too.
pub const OS_NULLISRPRIO: OS_PRIO = 0x100;

pub const OS_CLZWORD_NBITS: usize = OS_CLZWORD::BITS as usize;
/// The highest bit of a CLZ word, which stands for the highest priority
pub const OS_CLZWORD_HIGHBIT: OS_CLZWORD = 1 << (OS_CLZWORD_NBITS - 1);
/// Slave words needed to cover every possible task priority
pub const OS_MAX_SLAVE_WORDS: usize =
    (OS_MAXPOSSIBLETASKPRIO as usize + 1).div_ceil(OS_CLZWORD_NBITS);

/// `GetCpuLoad()` result when the core does not measure its load
pub const OS_CPULOAD_INVALID: u8 = 255;

/// Converts an interrupt level into an interrupt priority
#[inline(always)]
pub const fn OS_IsrLevelToPrio(level: OS_PRIO) -> OS_PRIO {
    level + OS_NULLISRPRIO
}

/// Resource ceilings above every task priority are interrupt priorities
#[inline(always)]
pub const fn OS_IsIsrPrio(prio: OS_PRIO) -> bool {
    prio > OS_MAXPOSSIBLETASKPRIO
}
