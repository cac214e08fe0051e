//! Priority queues.
//!
//! A queue is a window `[base, base + n_entries)` of the core's slot arena.
//! Single-slot queues are just that slot. Multi-slot queues are circular
//! buffers: the entries occupy `[head, next)` modulo `n_entries`, every other
//! slot holds `OS_NULLTASK`, and the queue is empty iff the slot at `head` is
//! `OS_NULLTASK`.
//!
//! All functions here expect interrupts to be locked and keep the priority
//! bitword in step with the queue contents.

use alloc::vec::Vec;

use critical_section::CriticalSection;
use osek_cfg::{
    OS_NULLTASK, OS_TASKID, OS_TASKLINK, OS_TASKPRIO, OsPanic, OsPriorityQueue,
    PriorityQueueDynamic,
};
use osek_structs::cell::KernelCell;

use crate::KernelData;

#[inline(always)]
fn next_index(index: OS_TASKLINK, n_entries: OS_TASKLINK) -> OS_TASKLINK {
    if index + 1 == n_entries { 0 } else { index + 1 }
}

#[inline(always)]
fn prev_index(index: OS_TASKLINK, n_entries: OS_TASKLINK) -> OS_TASKLINK {
    if index == 0 { n_entries - 1 } else { index - 1 }
}

impl<'a> KernelData<'a> {
    #[inline(always)]
    pub(crate) fn queue(&self, prio: OS_TASKPRIO) -> &'a OsPriorityQueue {
        &self.cfg.priority_queues[prio as usize]
    }

    #[inline(always)]
    pub(crate) fn slot(&self, pq: &OsPriorityQueue, index: OS_TASKLINK) -> &KernelCell<OS_TASKID> {
        &self.slots[pq.base as usize + index as usize]
    }

    #[inline(always)]
    fn dynamic(&self, index: u16) -> &KernelCell<PriorityQueueDynamic> {
        &self.queue_dynamics[index as usize]
    }

    /// The task at the head of queue `prio`, OS_NULLTASK if it is empty.
    pub fn queue_head(&self, _cs: CriticalSection<'_>, prio: OS_TASKPRIO) -> OS_TASKID {
        let pq = self.queue(prio);
        match pq.dynamic {
            Some(d) => self.slot(pq, self.dynamic(d).get().head).get(),
            None if pq.n_entries == 0 => OS_NULLTASK,
            None => self.slot(pq, 0).get(),
        }
    }

    /// Append `task` to queue `prio`.
    pub(crate) fn enqueue(
        &self,
        cs: CriticalSection<'_>,
        task: OS_TASKID,
        prio: OS_TASKPRIO,
    ) -> Result<(), OsPanic> {
        let pq = self.queue(prio);
        queue_log!(trace, "enqueue task {} at prio {}", task, prio);
        match pq.dynamic {
            None => self.put_single(cs, pq, task),
            Some(d) => {
                let cell = self.dynamic(d);
                let mut dynamic = cell.get();
                let was_empty = self.slot(pq, dynamic.head).get() == OS_NULLTASK;
                let tail = self.slot(pq, dynamic.next);
                if tail.get() != OS_NULLTASK {
                    return Err(OsPanic::QueueOverflow);
                }
                tail.set(task);
                dynamic.next = next_index(dynamic.next, pq.n_entries);
                cell.set(dynamic);
                if was_empty {
                    self.set_priority_bits(cs, pq);
                }
                Ok(())
            }
        }
    }

    /// Put `task` in front of everything else in queue `prio`. This is how a
    /// running task moves between priorities without losing its place.
    pub(crate) fn enqueue_at_head(
        &self,
        cs: CriticalSection<'_>,
        task: OS_TASKID,
        prio: OS_TASKPRIO,
    ) -> Result<(), OsPanic> {
        let pq = self.queue(prio);
        queue_log!(trace, "enqueue task {} at head of prio {}", task, prio);
        match pq.dynamic {
            None => self.put_single(cs, pq, task),
            Some(d) => {
                let cell = self.dynamic(d);
                let mut dynamic = cell.get();
                let was_empty = self.slot(pq, dynamic.head).get() == OS_NULLTASK;
                let head = prev_index(dynamic.head, pq.n_entries);
                let slot = self.slot(pq, head);
                if slot.get() != OS_NULLTASK {
                    return Err(OsPanic::QueueOverflow);
                }
                slot.set(task);
                dynamic.head = head;
                cell.set(dynamic);
                if was_empty {
                    self.set_priority_bits(cs, pq);
                }
                Ok(())
            }
        }
    }

    fn put_single(
        &self,
        cs: CriticalSection<'_>,
        pq: &OsPriorityQueue,
        task: OS_TASKID,
    ) -> Result<(), OsPanic> {
        if pq.n_entries == 0 {
            return Err(OsPanic::QueueOverflow);
        }
        let slot = self.slot(pq, 0);
        if slot.get() != OS_NULLTASK {
            return Err(OsPanic::QueueOverflow);
        }
        slot.set(task);
        self.set_priority_bits(cs, pq);
        Ok(())
    }

    /// Remove and return the head of queue `prio`; OS_NULLTASK if it was
    /// already empty.
    pub(crate) fn remove_priority_queue_head(
        &self,
        cs: CriticalSection<'_>,
        prio: OS_TASKPRIO,
    ) -> OS_TASKID {
        let pq = self.queue(prio);
        let task = match pq.dynamic {
            None => {
                if pq.n_entries == 0 {
                    return OS_NULLTASK;
                }
                let task = self.slot(pq, 0).replace(OS_NULLTASK);
                if task != OS_NULLTASK {
                    self.clr_priority_bits(cs, pq);
                }
                task
            }
            Some(d) => {
                let cell = self.dynamic(d);
                let mut dynamic = cell.get();
                let task = self.slot(pq, dynamic.head).replace(OS_NULLTASK);
                if task == OS_NULLTASK {
                    return OS_NULLTASK;
                }
                dynamic.head = next_index(dynamic.head, pq.n_entries);
                cell.set(dynamic);
                if self.slot(pq, dynamic.head).get() == OS_NULLTASK {
                    self.clr_priority_bits(cs, pq);
                }
                task
            }
        };
        queue_log!(trace, "removed task {} from head of prio {}", task, prio);
        task
    }

    /// Move the head of queue `from` to the head of queue `to`.
    pub(crate) fn requeue(
        &self,
        cs: CriticalSection<'_>,
        task: OS_TASKID,
        from: OS_TASKPRIO,
        to: OS_TASKPRIO,
    ) -> Result<(), OsPanic> {
        if from == to {
            return Ok(());
        }
        let removed = self.remove_priority_queue_head(cs, from);
        debug_assert_eq!(removed, task);
        self.enqueue_at_head(cs, task, to)
    }

    /// The entries of queue `prio` from head to tail.
    pub fn queue_contents(&self, cs: CriticalSection<'_>, prio: OS_TASKPRIO) -> Vec<OS_TASKID> {
        let pq = self.queue(prio);
        let mut entries = Vec::new();
        match pq.dynamic {
            None => {
                let head = self.queue_head(cs, prio);
                if head != OS_NULLTASK {
                    entries.push(head);
                }
            }
            Some(d) => {
                let mut index = self.dynamic(d).get().head;
                for _ in 0..pq.n_entries {
                    let task = self.slot(pq, index).get();
                    if task == OS_NULLTASK {
                        break;
                    }
                    entries.push(task);
                    index = next_index(index, pq.n_entries);
                }
            }
        }
        entries
    }

    /// How many slots of this core's arena hold `task`
    pub fn slots_holding(&self, task: OS_TASKID) -> usize {
        self.slots.iter().filter(|slot| slot.get() == task).count()
    }
}
