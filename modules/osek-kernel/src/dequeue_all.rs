use critical_section::CriticalSection;
use osek_cfg::{OS_NULLTASK, OS_TASKID, OS_TASKPRIO, OsTask};

use crate::{KernelData, OsTaskDynamic};

impl KernelData<'_> {
    /// Remove every queued activation of `task`.
    ///
    /// A running task that raised its priority sits at the head of the queue
    /// of its current priority, so above `queue_prio` only queue heads are
    /// looked at. At `queue_prio` its pending activations may be anywhere in
    /// the buffer and are squeezed out in one pass that keeps the other
    /// tasks' entries in order. Afterwards no slot of the core holds `task`,
    /// its activation counter is zero and `task_queue_head` is recomputed.
    pub(crate) fn dequeue_all(&self, cs: CriticalSection<'_>, task: &OsTask, dynamic: &OsTaskDynamic) {
        let id = task.task_id;
        let mut prio = dynamic.prio.get();
        queue_log!(debug, "dequeue all of task {} from prio {}", id, prio);

        while prio > task.queue_prio {
            if self.queue_head(cs, prio) == id {
                self.remove_priority_queue_head(cs, prio);
            }
            prio -= 1;
        }
        self.remove_all_from_queue(cs, id, task.queue_prio);

        dynamic.n_act.set(0);
        self.find_highest_task(cs);
    }

    /// Stable in-place removal of all entries of `task` from queue `prio`.
    fn remove_all_from_queue(&self, cs: CriticalSection<'_>, task: OS_TASKID, prio: OS_TASKPRIO) {
        let pq = self.queue(prio);
        let Some(d) = pq.dynamic else {
            if pq.n_entries != 0 && self.slot(pq, 0).get() == task {
                self.remove_priority_queue_head(cs, prio);
            }
            return;
        };

        let cell = &self.queue_dynamics[d as usize];
        let mut dynamic = cell.get();
        let n = pq.n_entries;
        let step = |i: u16| if i + 1 == n { 0 } else { i + 1 };

        // `write` trails `read`; kept entries move up to it
        let mut read = dynamic.head;
        let mut write = dynamic.head;
        let mut removed = 0u16;
        for _ in 0..n {
            let entry = self.slot(pq, read).get();
            if entry == OS_NULLTASK {
                break;
            }
            if entry == task {
                removed += 1;
            } else {
                if write != read {
                    self.slot(pq, write).set(entry);
                }
                write = step(write);
            }
            read = step(read);
        }
        if removed == 0 {
            return;
        }

        let mut clear = write;
        for _ in 0..removed {
            self.slot(pq, clear).set(OS_NULLTASK);
            clear = step(clear);
        }
        dynamic.next = write;
        cell.set(dynamic);

        if self.slot(pq, dynamic.head).get() == OS_NULLTASK {
            self.clr_priority_bits(cs, pq);
        }
    }
}
