use crate::{OS_CLZWORD, OS_TASKLINK};

/// One priority level of one core.
///
/// `base` and `n_entries` describe the level's window into the core's slot
/// arena. A level with more than one slot is a circular buffer whose head and
/// next-free indices live in the core's dynamic queue variables at index
/// `dynamic`; a single-slot level has no dynamic variables at all.
///
/// `master_bit` is the level's bit in the core's master word, `slave_bit` its
/// bit in slave word number `slave`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsPriorityQueue {
    pub base: OS_TASKLINK,
    pub n_entries: OS_TASKLINK,
    pub dynamic: Option<u16>,
    pub master_bit: OS_CLZWORD,
    pub slave_bit: OS_CLZWORD,
    pub slave: u8,
}

impl OsPriorityQueue {
    #[inline(always)]
    pub const fn end(&self) -> usize {
        self.base as usize + self.n_entries as usize
    }
}

/// Circular buffer indices of a multi-slot priority queue, relative to the
/// queue's base.
///
/// The queue is empty iff the slot at `head` holds `OS_NULLTASK`; `next` is
/// where the next activation goes. A full queue has `next == head`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityQueueDynamic {
    pub head: OS_TASKLINK,
    pub next: OS_TASKLINK,
}
