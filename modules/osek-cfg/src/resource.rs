use crate::{OS_COREID, OS_IsIsrPrio, OS_PRIO, OS_RESOURCEID, OS_TASKPRIO};

/// A resource and its ceiling priority.
///
/// Ceilings above [`OS_MAXPOSSIBLETASKPRIO`](crate::OS_MAXPOSSIBLETASKPRIO)
/// are interrupt priorities. A task taking such a resource is queued at its
/// core's `max_prio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsResource {
    pub resource_id: OS_RESOURCEID,
    pub core: OS_COREID,
    pub prio: OS_PRIO,
}

impl OsResource {
    pub const fn new(resource_id: OS_RESOURCEID, core: OS_COREID, prio: OS_PRIO) -> Self {
        Self { resource_id, core, prio }
    }

    #[inline(always)]
    pub const fn is_isr_resource(&self) -> bool {
        OS_IsIsrPrio(self.prio)
    }

    /// The task-queue priority a holder of this resource is raised to.
    #[inline]
    pub const fn queue_prio(&self, max_prio: OS_TASKPRIO) -> OS_TASKPRIO {
        if self.is_isr_resource() {
            max_prio
        } else {
            self.prio as OS_TASKPRIO
        }
    }
}
