use crate::{
    CpuLoadConfig, OS_APPID, OS_COREID, OS_N_CORES_MAX, OS_TASKPRIO, OsError, OsPriorityQueue,
    OsResource, OsTask, ProtectionAction,
};

/// OSEK conformance class of the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConformanceClass {
    BCC1,
    BCC2,
    ECC1,
    ECC2,
}

impl ConformanceClass {
    /// CC2: several activations per task and several tasks per priority
    pub const fn allows_multiple_activations(self) -> bool {
        matches!(self, Self::BCC2 | Self::ECC2)
    }
}

/// An OS-application. Only the parts the kernel core needs.
#[derive(Debug, Clone, Copy)]
pub struct OsApplication {
    pub app_id: OS_APPID,
    pub core: OS_COREID,
    pub startup_hook: Option<fn(OS_APPID)>,
}

/// Hook functions of the system
#[derive(Debug, Clone, Copy, Default)]
pub struct OsHooks {
    pub startup: Option<fn(OS_COREID)>,
    pub error: Option<fn(OsError)>,
    pub protection: Option<fn(OsError) -> ProtectionAction>,
}

/// Per-core tables: the priority queue geometry and the cpu-load setup.
#[derive(Debug, Clone, Copy)]
pub struct OsCoreConfig<'a> {
    /// number of priority queues (`OS_nPriorities`)
    pub n_priorities: usize,
    /// size of the slot arena shared by all queues (`OS_nPrioritySlots`)
    pub n_priority_slots: usize,
    /// number of dynamic queue variable sets
    pub n_queue_dynamics: usize,
    /// highest priority a task on this core can take (`OS_maxPrio`)
    pub max_prio: OS_TASKPRIO,
    /// indexed by priority
    pub priority_queues: &'a [OsPriorityQueue],
    pub cpu_load: Option<CpuLoadConfig>,
}

impl OsCoreConfig<'_> {
    pub const EMPTY: OsCoreConfig<'static> = OsCoreConfig {
        n_priorities: 0,
        n_priority_slots: 0,
        n_queue_dynamics: 0,
        max_prio: 0,
        priority_queues: &[],
        cpu_load: None,
    };
}

/// The complete generator output for one ECU.
///
/// `tasks[i].task_id == i` and `resources[i].resource_id == i`.
#[derive(Debug, Clone, Copy)]
pub struct KernelConfig<'a> {
    pub n_cores: usize,
    pub conformance: ConformanceClass,
    pub tasks: &'a [OsTask],
    pub resources: &'a [OsResource],
    pub apps: &'a [OsApplication],
    pub cores: [OsCoreConfig<'a>; OS_N_CORES_MAX],
    pub hooks: OsHooks,
}

impl<'a> KernelConfig<'a> {
    #[inline(always)]
    pub fn core(&self, core: OS_COREID) -> &OsCoreConfig<'a> {
        &self.cores[core as usize]
    }

    /// Tasks that live on `core`
    pub fn core_tasks(&self, core: OS_COREID) -> impl Iterator<Item = &OsTask> + '_ {
        self.tasks.iter().filter(move |t| t.core == core)
    }

    /// Resources that live on `core`
    pub fn core_resources(&self, core: OS_COREID) -> impl Iterator<Item = &OsResource> + '_ {
        self.resources.iter().filter(move |r| r.core == core)
    }
}
