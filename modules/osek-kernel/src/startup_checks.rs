//! Startup checks of the priority queue tables.
//!
//! The build-time generator is trusted to emit consistent tables, but the
//! kernel re-derives every property it relies on before the first dispatch:
//! a queue that is one slot short or a bit that points at the wrong word
//! would only show up as a corrupted queue much later. Each violated property
//! has its own panic code. The checks only read the configuration.

use osek_cfg::{
    KernelConfig, OS_CLZWORD, OS_CLZWORD_HIGHBIT, OS_COREID, OsCoreConfig, OsPanic,
    OsPriorityQueue,
};

/// `OS_StartupChecksQueue` for every configured core.
pub fn startup_checks_queue(cfg: &KernelConfig<'_>) -> Result<(), OsPanic> {
    for core in 0..cfg.n_cores.min(cfg.cores.len()) {
        check_core(cfg, core as OS_COREID).inspect_err(|_code| {
            check_log!(error, "startup check failed on core {}: {}", core, _code);
        })?;
    }
    check_log!(debug, "priority queue tables are consistent");
    Ok(())
}

fn check_core(cfg: &KernelConfig<'_>, core: OS_COREID) -> Result<(), OsPanic> {
    let core_cfg = cfg.core(core);
    check_number_of_queues(cfg, core)?;
    for prio in 0..core_cfg.n_priorities {
        check_slot_number_for_prio(cfg, core, prio)?;
    }
    check_queue_dynamics(cfg, core_cfg)?;
    check_queue_memory(core_cfg)?;
    check_master_slave_bits(core_cfg)
}

/// One queue per priority from 0 up to the highest priority a task of the
/// core can be queued at.
fn check_number_of_queues(cfg: &KernelConfig<'_>, core: OS_COREID) -> Result<(), OsPanic> {
    let core_cfg = cfg.core(core);
    let mut highest: Option<usize> = None;
    for task in cfg.core_tasks(core) {
        let prio = task.queue_prio.max(task.run_prio) as usize;
        highest = Some(highest.map_or(prio, |h| h.max(prio)));
    }
    let expected = match highest {
        None => 0,
        Some(task_prio) => {
            let resource_prio = cfg
                .core_resources(core)
                .map(|r| r.queue_prio(core_cfg.max_prio) as usize)
                .max()
                .unwrap_or(0);
            task_prio.max(resource_prio) + 1
        }
    };
    if core_cfg.n_priorities != expected || core_cfg.priority_queues.len() != expected {
        return Err(OsPanic::SCHK_WrongNumberOfPriorityQueues);
    }
    Ok(())
}

/// A level has one slot per possible activation of the tasks queued there,
/// plus one if a running task or a resource holder can be raised to it.
fn check_slot_number_for_prio(
    cfg: &KernelConfig<'_>,
    core: OS_COREID,
    prio: usize,
) -> Result<(), OsPanic> {
    let core_cfg = cfg.core(core);
    let mut expected = 0usize;
    let mut extra = false;
    for task in cfg.core_tasks(core) {
        if task.queue_prio as usize == prio {
            expected += task.n_slots();
        }
        if task.run_prio as usize == prio && task.run_prio > task.queue_prio {
            extra = true;
        }
    }
    if cfg
        .core_resources(core)
        .any(|r| r.queue_prio(core_cfg.max_prio) as usize == prio)
    {
        extra = true;
    }
    if extra {
        expected += 1;
    }
    if core_cfg.priority_queues[prio].n_entries as usize != expected {
        return Err(OsPanic::SCHK_WrongNumberOfQueueEntries);
    }
    Ok(())
}

/// Only multi-slot queues have circular buffer indices, each its own, and
/// they exist only when the conformance class allows them.
fn check_queue_dynamics(cfg: &KernelConfig<'_>, core_cfg: &OsCoreConfig<'_>) -> Result<(), OsPanic> {
    let queues = core_cfg.priority_queues;
    for (prio, pq) in queues.iter().enumerate() {
        match pq.dynamic {
            Some(_) if pq.n_entries <= 1 => return Err(OsPanic::SCHK_SingleEntryQueueHasDynamicVars),
            None if pq.n_entries > 1 => return Err(OsPanic::SCHK_MultiEntryQueueHasNoDynamicVars),
            None => {}
            Some(d) => {
                if !cfg.conformance.allows_multiple_activations() {
                    return Err(OsPanic::SCHK_MultiEntryQueueNotCC2);
                }
                if d as usize >= core_cfg.n_queue_dynamics {
                    return Err(OsPanic::SCHK_MultiEntryQueueHasNoDynamicVars);
                }
                if queues[..prio].iter().any(|other| other.dynamic == Some(d)) {
                    return Err(OsPanic::SCHK_SharedQueueDynamicVars);
                }
            }
        }
    }
    Ok(())
}

/// The queues tile the slot arena: every queue inside it, no two sharing a
/// slot, and together covering all of it.
fn check_queue_memory(core_cfg: &OsCoreConfig<'_>) -> Result<(), OsPanic> {
    let n_slots = core_cfg.n_priority_slots;
    let used = || core_cfg.priority_queues.iter().filter(|pq| pq.n_entries != 0);

    if used().any(|pq| pq.end() > n_slots) {
        return Err(OsPanic::SCHK_QueueOutOfBounds);
    }
    for (i, a) in used().enumerate() {
        if used().skip(i + 1).any(|b| overlaps(a, b)) {
            return Err(OsPanic::SCHK_OverlappingQueues);
        }
    }

    let total: usize = used().map(|pq| pq.n_entries as usize).sum();
    let starts = used().filter(|pq| pq.base == 0).count();
    let ends = used().filter(|pq| pq.end() == n_slots).count();
    let boundaries_ok = if n_slots == 0 {
        starts == 0 && ends == 0
    } else {
        starts == 1 && ends == 1
    };
    if total != n_slots || !boundaries_ok {
        return Err(OsPanic::SCHK_GapInQueues);
    }
    Ok(())
}

#[inline]
fn overlaps(a: &OsPriorityQueue, b: &OsPriorityQueue) -> bool {
    (a.base as usize) < b.end() && (b.base as usize) < a.end()
}

/// Walking from the highest priority down, the slave bit moves right one
/// position per priority, wrapping into the next slave word (and the next
/// master bit) every `OS_CLZWORD_NBITS` priorities.
fn check_master_slave_bits(core_cfg: &OsCoreConfig<'_>) -> Result<(), OsPanic> {
    let mut master_bit: OS_CLZWORD = OS_CLZWORD_HIGHBIT;
    let mut slave_bit: OS_CLZWORD = OS_CLZWORD_HIGHBIT;
    let mut slave = 0u8;
    for pq in core_cfg.priority_queues.iter().rev() {
        if pq.master_bit != master_bit {
            return Err(OsPanic::SCHK_WrongMasterBit);
        }
        if pq.slave != slave {
            return Err(OsPanic::SCHK_WrongSlaveWord);
        }
        if pq.slave_bit != slave_bit {
            return Err(OsPanic::SCHK_WrongSlaveBit);
        }
        slave_bit >>= 1;
        if slave_bit == 0 {
            slave_bit = OS_CLZWORD_HIGHBIT;
            master_bit >>= 1;
            slave += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use osek_cfg::generator::ConfigGenerator;
    use osek_cfg::{ConformanceClass, OsResource, OsTask};

    #[test]
    fn generated_tables_pass() {
        let generated = ConfigGenerator::new(2, ConformanceClass::ECC2)
            .task(OsTask::new(0, 0, 2).with_max_act(1))
            .task(OsTask::new(1, 0, 2))
            .task(OsTask::new(2, 1, 5).with_run_prio(7))
            .resource(OsResource::new(0, 0, 4))
            .build()
            .unwrap();
        assert_eq!(startup_checks_queue(&generated.config()), Ok(()));
    }

    #[test]
    fn shared_dynamic_vars_are_found() {
        let mut generated = ConfigGenerator::new(1, ConformanceClass::BCC2)
            .task(OsTask::new(0, 0, 1).with_max_act(1))
            .task(OsTask::new(1, 0, 2).with_max_act(1))
            .build()
            .unwrap();
        generated.cores[0].priority_queues[1].dynamic = Some(0);
        assert_eq!(
            startup_checks_queue(&generated.config()),
            Err(OsPanic::SCHK_SharedQueueDynamicVars)
        );
    }
}
