//! The two-level CLZ priority bitword.
//!
//! Priority `p` of a core with `n` priorities has rank `n - 1 - p`: the
//! highest priority is rank 0 and owns the most significant bit of slave
//! word 0. A slave word's own bit in the master word is set while the slave
//! word is non-zero, so two count-leading-zeros find the highest non-empty
//! queue.

use critical_section::CriticalSection;
use osek_cfg::{OS_CLZWORD_NBITS, OS_NULLTASK, OS_TASKID, OS_TASKPRIO, OsPriorityQueue};

use crate::KernelData;

impl KernelData<'_> {
    /// Mark the queue as non-empty.
    #[inline]
    pub(crate) fn set_priority_bits(&self, _cs: CriticalSection<'_>, pq: &OsPriorityQueue) {
        self.slave_prio_words[pq.slave as usize].with_mut(|w| *w |= pq.slave_bit);
        self.master_prio_word.with_mut(|w| *w |= pq.master_bit);
    }

    /// Mark the queue as empty. The master bit goes when the last slave bit
    /// of its word goes.
    #[inline]
    pub(crate) fn clr_priority_bits(&self, _cs: CriticalSection<'_>, pq: &OsPriorityQueue) {
        let slave = self.slave_prio_words[pq.slave as usize].with_mut(|w| {
            *w &= !pq.slave_bit;
            *w
        });
        if slave == 0 {
            self.master_prio_word.with_mut(|w| *w &= !pq.master_bit);
        }
    }

    /// Whether the bitword says queue `prio` is non-empty
    pub fn priority_bit_is_set(&self, prio: OS_TASKPRIO) -> bool {
        match self.cfg.priority_queues.get(prio as usize) {
            Some(pq) => self.slave_word(pq.slave as usize) & pq.slave_bit != 0,
            None => false,
        }
    }

    /// Highest priority with a non-empty queue
    pub fn find_highest_prio(&self) -> Option<OS_TASKPRIO> {
        let master = self.master_prio_word.get();
        if master == 0 {
            return None;
        }
        let m = master.leading_zeros() as usize;
        let slave = self.slave_prio_words[m].get();
        // a set master bit always has a non-empty slave word behind it
        let s = slave.leading_zeros() as usize;
        let rank = m * OS_CLZWORD_NBITS + s;
        let n_prio = self.cfg.n_priorities;
        if slave == 0 || rank >= n_prio {
            return None;
        }
        Some((n_prio - 1 - rank) as OS_TASKPRIO)
    }

    /// Recompute `task_queue_head` from the bitword and return it.
    pub(crate) fn find_highest_task(&self, cs: CriticalSection<'_>) -> OS_TASKID {
        let head = match self.find_highest_prio() {
            Some(prio) => self.queue_head(cs, prio),
            None => OS_NULLTASK,
        };
        queue_log!(trace, "core {} queue head is now {}", self.core_id, head);
        self.task_queue_head.set(head);
        head
    }
}

#[cfg(test)]
mod tests {
    use osek_cfg::generator::ConfigGenerator;
    use osek_cfg::{ConformanceClass, OsTask};

    use crate::KernelData;

    #[test]
    fn highest_of_two_slave_words() {
        let mut generator = ConfigGenerator::new(1, ConformanceClass::BCC1);
        for id in 0..40u16 {
            generator = generator.task(OsTask::new(id, 0, id as u8));
        }
        let generated = generator.build().unwrap();
        let cfg = generated.config();
        let kd = KernelData::new(0, cfg.core(0));

        critical_section::with(|cs| {
            let queues = cfg.core(0).priority_queues;
            assert_eq!(kd.find_highest_prio(), None);

            kd.set_priority_bits(cs, &queues[3]);
            assert_eq!(kd.find_highest_prio(), Some(3));
            kd.set_priority_bits(cs, &queues[5]);
            assert_eq!(kd.find_highest_prio(), Some(5));
            kd.set_priority_bits(cs, &queues[20]);
            assert_eq!(kd.find_highest_prio(), Some(20));

            kd.clr_priority_bits(cs, &queues[20]);
            assert_eq!(kd.find_highest_prio(), Some(5));
            assert!(kd.master_word() != 0);

            // 3 and 5 live in the second slave word
            kd.clr_priority_bits(cs, &queues[5]);
            kd.clr_priority_bits(cs, &queues[3]);
            assert_eq!(kd.master_word(), 0);
            assert_eq!(kd.find_highest_prio(), None);
        });
    }
}
