//! Host-side table generator.
//!
//! Derives the per-core priority queue tables from a task and resource
//! description, the same way the build-time generator does for a real ECU.
//! The kernel's startup checks re-validate every table produced here, so the
//! generator is also the reference for what a valid configuration looks like.

use alloc::vec::Vec;

use crate::{
    ConformanceClass, CpuLoadConfig, KernelConfig, OS_CLZWORD, OS_CLZWORD_HIGHBIT,
    OS_CLZWORD_NBITS, OS_COREID, OS_MAXPOSSIBLETASKPRIO, OS_N_CORES_MAX, OS_TASKLINK, OS_TASKPRIO,
    OsApplication, OsCoreConfig, OsHooks, OsPriorityQueue, OsResource, OsTask, TaskFlags,
};

/// Why a description cannot be turned into tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenError {
    TooManyCores,
    /// an object refers to a core beyond `n_cores`
    UnknownCore,
    /// ids must equal the table index
    IdOutOfOrder,
    /// a task's run priority is below its queue priority
    RunPrioBelowQueuePrio,
    /// the core's maximum priority would exceed the task priority range
    PriorityOutOfRange,
    /// a priority level needs several slots but the class is CC1
    NeedsCC2,
    /// a cpu-load window that is empty or does not fit in 32 bits
    InvalidCpuLoad,
}

/// Per-core output of the generator
#[derive(Debug, Clone, Default)]
pub struct CoreTables {
    pub n_priorities: usize,
    pub n_priority_slots: usize,
    pub n_queue_dynamics: usize,
    pub max_prio: OS_TASKPRIO,
    pub priority_queues: Vec<OsPriorityQueue>,
    pub cpu_load: Option<CpuLoadConfig>,
}

/// Owned generator output. [`GeneratedConfig::config`] borrows it as the
/// table set the kernel runs on.
#[derive(Debug, Clone)]
pub struct GeneratedConfig {
    pub n_cores: usize,
    pub conformance: ConformanceClass,
    pub tasks: Vec<OsTask>,
    pub resources: Vec<OsResource>,
    pub apps: Vec<OsApplication>,
    pub cores: [CoreTables; OS_N_CORES_MAX],
    pub hooks: OsHooks,
}

impl GeneratedConfig {
    pub fn config(&self) -> KernelConfig<'_> {
        let mut cores = [OsCoreConfig::EMPTY; OS_N_CORES_MAX];
        for (core, tables) in cores.iter_mut().zip(self.cores.iter()) {
            *core = OsCoreConfig {
                n_priorities: tables.n_priorities,
                n_priority_slots: tables.n_priority_slots,
                n_queue_dynamics: tables.n_queue_dynamics,
                max_prio: tables.max_prio,
                priority_queues: &tables.priority_queues,
                cpu_load: tables.cpu_load,
            };
        }
        KernelConfig {
            n_cores: self.n_cores,
            conformance: self.conformance,
            tasks: &self.tasks,
            resources: &self.resources,
            apps: &self.apps,
            cores,
            hooks: self.hooks,
        }
    }
}

/// Collects the system description.
#[derive(Debug, Clone)]
pub struct ConfigGenerator {
    n_cores: usize,
    conformance: ConformanceClass,
    tasks: Vec<OsTask>,
    resources: Vec<OsResource>,
    apps: Vec<OsApplication>,
    cpu_load: [Option<CpuLoadConfig>; OS_N_CORES_MAX],
    hooks: OsHooks,
}

impl ConfigGenerator {
    pub fn new(n_cores: usize, conformance: ConformanceClass) -> Self {
        Self {
            n_cores,
            conformance,
            tasks: Vec::new(),
            resources: Vec::new(),
            apps: Vec::new(),
            cpu_load: [None; OS_N_CORES_MAX],
            hooks: OsHooks::default(),
        }
    }

    pub fn task(mut self, task: OsTask) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn resource(mut self, resource: OsResource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn app(mut self, app: OsApplication) -> Self {
        self.apps.push(app);
        self
    }

    pub fn cpu_load(mut self, core: OS_COREID, cfg: CpuLoadConfig) -> Self {
        if let Some(slot) = self.cpu_load.get_mut(core as usize) {
            *slot = Some(cfg);
        }
        self
    }

    pub fn hooks(mut self, hooks: OsHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn build(self) -> Result<GeneratedConfig, GenError> {
        if self.n_cores == 0 || self.n_cores > OS_N_CORES_MAX {
            return Err(GenError::TooManyCores);
        }
        let mut tasks = self.tasks;
        for (i, t) in tasks.iter().enumerate() {
            if t.task_id as usize != i {
                return Err(GenError::IdOutOfOrder);
            }
            if t.core as usize >= self.n_cores {
                return Err(GenError::UnknownCore);
            }
            if t.run_prio < t.queue_prio {
                return Err(GenError::RunPrioBelowQueuePrio);
            }
        }
        for (i, r) in self.resources.iter().enumerate() {
            if r.resource_id as usize != i {
                return Err(GenError::IdOutOfOrder);
            }
            if r.core as usize >= self.n_cores {
                return Err(GenError::UnknownCore);
            }
        }
        if self.apps.iter().any(|a| a.core as usize >= self.n_cores) {
            return Err(GenError::UnknownCore);
        }
        if self.cpu_load.iter().flatten().any(|c| !c.is_valid()) {
            return Err(GenError::InvalidCpuLoad);
        }

        let mut cores: [CoreTables; OS_N_CORES_MAX] = Default::default();
        for core in 0..self.n_cores {
            let core_id = core as OS_COREID;
            cores[core] = generate_core(
                core_id,
                &mut tasks,
                &self.resources,
                self.conformance,
                self.cpu_load[core],
            )?;
        }

        Ok(GeneratedConfig {
            n_cores: self.n_cores,
            conformance: self.conformance,
            tasks,
            resources: self.resources,
            apps: self.apps,
            cores,
            hooks: self.hooks,
        })
    }
}

fn generate_core(
    core: OS_COREID,
    tasks: &mut [OsTask],
    resources: &[OsResource],
    conformance: ConformanceClass,
    cpu_load: Option<CpuLoadConfig>,
) -> Result<CoreTables, GenError> {
    let mut tables = CoreTables {
        cpu_load,
        ..Default::default()
    };
    if !tasks.iter().any(|t| t.core == core) {
        return Ok(tables);
    }

    let mut highest: u16 = 0;
    let mut needs_top = false;
    for t in tasks.iter().filter(|t| t.core == core) {
        if t.flags.contains(TaskFlags::NONPREEMPT) {
            needs_top = true;
        }
        highest = highest.max(t.run_prio as u16).max(t.queue_prio as u16);
    }
    for r in resources.iter().filter(|r| r.core == core) {
        if r.is_isr_resource() {
            needs_top = true;
        } else {
            highest = highest.max(r.prio);
        }
    }
    let max_prio = if needs_top { highest + 1 } else { highest };
    if max_prio > OS_MAXPOSSIBLETASKPRIO {
        return Err(GenError::PriorityOutOfRange);
    }
    let max_prio = max_prio as OS_TASKPRIO;
    for t in tasks
        .iter_mut()
        .filter(|t| t.core == core && t.flags.contains(TaskFlags::NONPREEMPT))
    {
        t.run_prio = max_prio;
    }

    let n_prio = max_prio as usize + 1;
    let mut entries: Vec<usize> = alloc::vec![0; n_prio];
    let mut parking: Vec<bool> = alloc::vec![false; n_prio];
    for t in tasks.iter().filter(|t| t.core == core) {
        entries[t.queue_prio as usize] += t.n_slots();
        if t.run_prio > t.queue_prio {
            parking[t.run_prio as usize] = true;
        }
    }
    for r in resources.iter().filter(|r| r.core == core) {
        parking[r.queue_prio(max_prio) as usize] = true;
    }

    // highest priority first in the arena and in the bitword
    let mut base = 0usize;
    let mut n_dynamics = 0usize;
    let mut queues: Vec<OsPriorityQueue> = alloc::vec![
        OsPriorityQueue {
            base: 0,
            n_entries: 0,
            dynamic: None,
            master_bit: 0,
            slave_bit: 0,
            slave: 0,
        };
        n_prio
    ];
    for prio in (0..n_prio).rev() {
        let n = entries[prio] + usize::from(parking[prio]);
        if n > 1 && !conformance.allows_multiple_activations() {
            return Err(GenError::NeedsCC2);
        }
        let rank = n_prio - 1 - prio;
        let slave = rank / OS_CLZWORD_NBITS;
        let dynamic = if n > 1 {
            n_dynamics += 1;
            Some((n_dynamics - 1) as u16)
        } else {
            None
        };
        queues[prio] = OsPriorityQueue {
            base: base as OS_TASKLINK,
            n_entries: n as OS_TASKLINK,
            dynamic,
            master_bit: OS_CLZWORD_HIGHBIT >> slave,
            slave_bit: OS_CLZWORD_HIGHBIT >> (rank % OS_CLZWORD_NBITS) as OS_CLZWORD,
            slave: slave as u8,
        };
        base += n;
    }

    tables.n_priorities = n_prio;
    tables.n_priority_slots = base;
    tables.n_queue_dynamics = n_dynamics;
    tables.max_prio = max_prio;
    tables.priority_queues = queues;
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OS_IsrLevelToPrio, OsTask};

    #[test]
    fn counts_activations_and_parking_slots() {
        let generated = ConfigGenerator::new(1, ConformanceClass::ECC2)
            .task(OsTask::new(0, 0, 2).with_max_act(1))
            .task(OsTask::new(1, 0, 2))
            .task(OsTask::new(2, 0, 5))
            .resource(OsResource::new(0, 0, 4))
            .build()
            .unwrap();
        let core = &generated.cores[0];
        assert_eq!(core.n_priorities, 6);
        assert_eq!(core.max_prio, 5);
        let n: Vec<_> = core.priority_queues.iter().map(|q| q.n_entries).collect();
        assert_eq!(n, [0, 0, 3, 0, 1, 1]);
        assert_eq!(core.n_priority_slots, 5);
        assert_eq!(core.n_queue_dynamics, 1);
        assert_eq!(core.priority_queues[2].dynamic, Some(0));
        assert_eq!(core.priority_queues[5].slave_bit, OS_CLZWORD_HIGHBIT);
        assert_eq!(core.priority_queues[4].slave_bit, OS_CLZWORD_HIGHBIT >> 1);
    }

    #[test]
    fn isr_resources_and_nonpreemptive_tasks_use_the_top_priority() {
        let generated = ConfigGenerator::new(1, ConformanceClass::BCC1)
            .task(OsTask::new(0, 0, 1))
            .task(OsTask::new(1, 0, 3).with_flags(TaskFlags::NONPREEMPT))
            .resource(OsResource::new(0, 0, OS_IsrLevelToPrio(2)))
            .build()
            .unwrap();
        assert_eq!(generated.cores[0].max_prio, 4);
        assert_eq!(generated.tasks[1].run_prio, 4);
        // both the non-preemptive task and the ISR resource park on level 4
        assert_eq!(generated.cores[0].priority_queues[4].n_entries, 1);
    }

    #[test]
    fn priorities_beyond_one_clz_word_move_the_master_bit() {
        let mut generator = ConfigGenerator::new(1, ConformanceClass::BCC1);
        for id in 0..40u16 {
            generator = generator.task(OsTask::new(id, 0, id as u8));
        }
        let generated = generator.build().unwrap();
        let queues = &generated.cores[0].priority_queues;
        assert_eq!(queues[39].master_bit, OS_CLZWORD_HIGHBIT);
        assert_eq!(queues[8].master_bit, OS_CLZWORD_HIGHBIT);
        assert_eq!(queues[7].master_bit, OS_CLZWORD_HIGHBIT >> 1);
        assert_eq!(queues[7].slave, 1);
        assert_eq!(queues[0].slave_bit, OS_CLZWORD_HIGHBIT >> 7);
    }

    #[test]
    fn multi_slot_levels_need_cc2() {
        let result = ConfigGenerator::new(1, ConformanceClass::BCC1)
            .task(OsTask::new(0, 0, 1))
            .task(OsTask::new(1, 0, 1))
            .build();
        assert_eq!(result.unwrap_err(), GenError::NeedsCC2);
    }

    #[test]
    fn cpu_load_window_must_fit_in_32_bits() {
        let system = |cfg| {
            ConfigGenerator::new(1, ConformanceClass::BCC1)
                .task(OsTask::new(0, 0, 1))
                .cpu_load(0, cfg)
                .build()
        };
        let result = system(CpuLoadConfig::new(u32::MAX, 10));
        assert_eq!(result.unwrap_err(), GenError::InvalidCpuLoad);
        let result = system(CpuLoadConfig::new(100, 0));
        assert_eq!(result.unwrap_err(), GenError::InvalidCpuLoad);
        let generated = system(CpuLoadConfig::new(100, 10)).unwrap();
        assert_eq!(generated.cores[0].cpu_load.map(|c| c.window_duration), Some(1000));
    }
}
