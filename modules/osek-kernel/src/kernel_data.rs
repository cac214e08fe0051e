use alloc::boxed::Box;
use alloc::vec::Vec;

use osek_cfg::{
    OS_CLZWORD, OS_COREID, OS_MAX_SLAVE_WORDS, OS_NULLTASK, OS_TASKID, OsCoreConfig, OsError,
    OsPanic, PriorityQueueDynamic,
};
use osek_structs::cell::KernelCell;

use crate::cpuload::OsCpuLoad;
use crate::message::{MessageQueue, ReplySlot};

/// What the core is executing right now. Services check it to reject calls
/// from the wrong level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OsContext {
    /// before `StartOS`, or no task ready
    Idle,
    Task,
    /// category-2 interrupt
    Isr,
    StartupHook,
    ErrorHook,
    ProtectionHook,
    /// the core was shut down by the protection hook
    Shutdown,
}

/*
*********************************************************************************************************
*                                           KERNEL DATA
*********************************************************************************************************
*/

/// Everything one core's scheduler keeps, built once from the core's tables.
pub struct KernelData<'a> {
    pub(crate) core_id: OS_COREID,
    pub(crate) cfg: &'a OsCoreConfig<'a>,

    /// highest priority task in the queues, OS_NULLTASK if none
    pub(crate) task_queue_head: KernelCell<OS_TASKID>,
    pub(crate) task_current: KernelCell<OS_TASKID>,
    pub(crate) in_function: KernelCell<OsContext>,
    /// nesting depth of category-2 interrupts
    pub(crate) isr_nesting: KernelCell<u8>,
    /// the cpu load counts the running task as busy
    pub(crate) task_busy: KernelCell<bool>,

    pub(crate) master_prio_word: KernelCell<OS_CLZWORD>,
    pub(crate) slave_prio_words: [KernelCell<OS_CLZWORD>; OS_MAX_SLAVE_WORDS],
    /// the slot arena every priority queue of this core is a window into
    pub(crate) slots: Box<[KernelCell<OS_TASKID>]>,
    pub(crate) queue_dynamics: Box<[KernelCell<PriorityQueueDynamic>]>,

    pub(crate) cpu_load: Option<OsCpuLoad>,
    pub(crate) inbox: MessageQueue,
    pub(crate) reply: ReplySlot,

    pub(crate) panic_code: KernelCell<Option<OsPanic>>,
    pub(crate) last_error: KernelCell<Option<OsError>>,
}

impl<'a> KernelData<'a> {
    pub(crate) fn new(core_id: OS_COREID, cfg: &'a OsCoreConfig<'a>) -> Self {
        let slots: Vec<KernelCell<OS_TASKID>> = (0..cfg.n_priority_slots)
            .map(|_| KernelCell::new(OS_NULLTASK))
            .collect();
        let queue_dynamics: Vec<KernelCell<PriorityQueueDynamic>> = (0..cfg.n_queue_dynamics)
            .map(|_| KernelCell::default())
            .collect();
        Self {
            core_id,
            cfg,
            task_queue_head: KernelCell::new(OS_NULLTASK),
            task_current: KernelCell::new(OS_NULLTASK),
            in_function: KernelCell::new(OsContext::Idle),
            isr_nesting: KernelCell::new(0),
            task_busy: KernelCell::new(false),
            master_prio_word: KernelCell::new(0),
            slave_prio_words: [const { KernelCell::new(0) }; OS_MAX_SLAVE_WORDS],
            slots: slots.into_boxed_slice(),
            queue_dynamics: queue_dynamics.into_boxed_slice(),
            cpu_load: cfg.cpu_load.filter(OsCpuLoad::usable).map(OsCpuLoad::new),
            inbox: MessageQueue::new(),
            reply: ReplySlot::new(),
            panic_code: KernelCell::new(None),
            last_error: KernelCell::new(None),
        }
    }

    #[inline(always)]
    pub fn core_id(&self) -> OS_COREID {
        self.core_id
    }

    #[inline(always)]
    pub fn config(&self) -> &'a OsCoreConfig<'a> {
        self.cfg
    }

    /// The task the dispatcher should run next
    #[inline(always)]
    pub fn task_queue_head(&self) -> OS_TASKID {
        self.task_queue_head.get()
    }

    #[inline(always)]
    pub fn current_task(&self) -> OS_TASKID {
        self.task_current.get()
    }

    #[inline(always)]
    pub fn in_function(&self) -> OsContext {
        self.in_function.get()
    }

    #[inline(always)]
    pub fn master_word(&self) -> OS_CLZWORD {
        self.master_prio_word.get()
    }

    pub fn slave_word(&self, slave: usize) -> OS_CLZWORD {
        self.slave_prio_words[slave].get()
    }

    pub fn cpu_load(&self) -> Option<&OsCpuLoad> {
        self.cpu_load.as_ref()
    }

    /// The panic this core raised, if any
    pub fn panic_code(&self) -> Option<OsPanic> {
        self.panic_code.get()
    }

    /// The last error a service on this core reported
    pub fn last_error(&self) -> Option<OsError> {
        self.last_error.get()
    }
}
