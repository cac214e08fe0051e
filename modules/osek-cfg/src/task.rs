use bitflags::bitflags;

use crate::{OS_ACT, OS_APPID, OS_COREID, OS_NULLAPP, OS_TASKID, OS_TASKPRIO};

bitflags! {
    /// Static task properties
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TaskFlags: u8 {
        /// the task may wait for events
        const EXTENDED = 0x01;
        /// the task runs at the core's maximum priority
        const NONPREEMPT = 0x02;
        /// activated by StartOS
        const AUTOSTART = 0x04;
    }
}

/// State of a task, kept in its dynamic part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OsTaskState {
    Suspended = 0,
    /// activated but has never run
    New,
    Ready,
    Running,
    Waiting,
    /// killed by the kernel after a protection-hook decision
    Quarantined,
}

/// The static part of a task as emitted by the generator.
///
/// `queue_prio` is the priority a task is queued at when it is activated or
/// when it gives up the CPU. While it runs it is at least at `run_prio`
/// (internal resource or non-preemptive scheduling), and higher while it holds
/// a resource. `max_act` is the number of activations that may be pending on
/// top of the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsTask {
    pub task_id: OS_TASKID,
    pub core: OS_COREID,
    pub app: OS_APPID,
    pub run_prio: OS_TASKPRIO,
    pub queue_prio: OS_TASKPRIO,
    pub max_act: OS_ACT,
    pub flags: TaskFlags,
}

impl OsTask {
    /// A basic, preemptive, single-activation task
    pub const fn new(task_id: OS_TASKID, core: OS_COREID, queue_prio: OS_TASKPRIO) -> Self {
        Self {
            task_id,
            core,
            app: OS_NULLAPP,
            run_prio: queue_prio,
            queue_prio,
            max_act: 0,
            flags: TaskFlags::empty(),
        }
    }

    pub const fn with_max_act(mut self, max_act: OS_ACT) -> Self {
        self.max_act = max_act;
        self
    }

    pub const fn with_run_prio(mut self, run_prio: OS_TASKPRIO) -> Self {
        self.run_prio = run_prio;
        self
    }

    pub const fn with_app(mut self, app: OS_APPID) -> Self {
        self.app = app;
        self
    }

    pub const fn with_flags(mut self, flags: TaskFlags) -> Self {
        self.flags = self.flags.union(flags);
        self
    }

    #[inline(always)]
    pub const fn is_extended(&self) -> bool {
        self.flags.contains(TaskFlags::EXTENDED)
    }

    /// Number of queue slots the task's activations need at `queue_prio`
    #[inline(always)]
    pub const fn n_slots(&self) -> usize {
        self.max_act as usize + 1
    }
}
