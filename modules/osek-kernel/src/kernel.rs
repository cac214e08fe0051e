use alloc::boxed::Box;
use alloc::vec::Vec;

use osek_cfg::{
    KernelConfig, OS_ACT, OS_COREID, OS_EVENTMASK, OS_N_CORES_MAX, OS_NULLRESOURCE, OS_NULLTASK,
    OS_RESOURCEID, OS_TASKID, OS_TASKPRIO, OsError, OsResource, OsTask, OsTaskState,
};
use osek_platform::Platform;
use osek_structs::cell::KernelCell;

use crate::KernelData;

/*
*********************************************************************************************************
*                                         DYNAMIC OBJECT DATA
*********************************************************************************************************
*/

/// The changing part of a task.
pub struct OsTaskDynamic {
    /// current priority; `queue_prio` unless the task runs or holds a resource
    pub(crate) prio: KernelCell<OS_TASKPRIO>,
    pub(crate) state: KernelCell<OsTaskState>,
    /// activations pending on top of the current one
    pub(crate) n_act: KernelCell<OS_ACT>,
    pub(crate) p_events: KernelCell<OS_EVENTMASK>,
    pub(crate) w_events: KernelCell<OS_EVENTMASK>,
    /// the resource taken last, head of the task's resource chain
    pub(crate) last_res: KernelCell<OS_RESOURCEID>,
}

impl OsTaskDynamic {
    fn new(task: &OsTask) -> Self {
        Self {
            prio: KernelCell::new(task.queue_prio),
            state: KernelCell::new(OsTaskState::Suspended),
            n_act: KernelCell::new(0),
            p_events: KernelCell::new(0),
            w_events: KernelCell::new(0),
            last_res: KernelCell::new(OS_NULLRESOURCE),
        }
    }

    pub fn prio(&self) -> OS_TASKPRIO {
        self.prio.get()
    }

    pub fn state(&self) -> OsTaskState {
        self.state.get()
    }

    pub fn n_act(&self) -> OS_ACT {
        self.n_act.get()
    }

    pub fn pending_events(&self) -> OS_EVENTMASK {
        self.p_events.get()
    }

    pub fn waiting_events(&self) -> OS_EVENTMASK {
        self.w_events.get()
    }

    pub fn last_resource(&self) -> OS_RESOURCEID {
        self.last_res.get()
    }
}

/// The changing part of a resource.
pub struct OsResourceDynamic {
    pub(crate) taken_by: KernelCell<OS_TASKID>,
    /// the holder's priority before it took the resource
    pub(crate) last_prio: KernelCell<OS_TASKPRIO>,
    /// the resource the holder took before this one
    pub(crate) next: KernelCell<OS_RESOURCEID>,
}

impl OsResourceDynamic {
    fn new() -> Self {
        Self {
            taken_by: KernelCell::new(OS_NULLTASK),
            last_prio: KernelCell::new(0),
            next: KernelCell::new(OS_NULLRESOURCE),
        }
    }

    pub fn taken_by(&self) -> OS_TASKID {
        self.taken_by.get()
    }
}

/*
*********************************************************************************************************
*                                               KERNEL
*********************************************************************************************************
*/

/// All runtime state of the OS, built once from the generator's tables.
pub struct Kernel<'a> {
    pub(crate) cfg: &'a KernelConfig<'a>,
    pub(crate) platform: &'a dyn Platform,
    tasks: Box<[OsTaskDynamic]>,
    resources: Box<[OsResourceDynamic]>,
    cores: Box<[KernelData<'a>]>,
}

impl<'a> Kernel<'a> {
    /// Allocate the runtime state for `cfg`. The tables are not validated
    /// here; `StartOS` does that before anything is scheduled.
    pub fn new(cfg: &'a KernelConfig<'a>, platform: &'a dyn Platform) -> Self {
        let n_cores = cfg.n_cores.min(OS_N_CORES_MAX);
        let cores: Vec<KernelData<'a>> = (0..n_cores)
            .map(|core| KernelData::new(core as OS_COREID, cfg.core(core as OS_COREID)))
            .collect();
        let tasks: Vec<OsTaskDynamic> = cfg.tasks.iter().map(OsTaskDynamic::new).collect();
        let resources: Vec<OsResourceDynamic> =
            cfg.resources.iter().map(|_| OsResourceDynamic::new()).collect();
        os_log!(info, "kernel created: {} cores, {} tasks", n_cores, cfg.tasks.len());
        Self {
            cfg,
            platform,
            tasks: tasks.into_boxed_slice(),
            resources: resources.into_boxed_slice(),
            cores: cores.into_boxed_slice(),
        }
    }

    pub fn config(&self) -> &'a KernelConfig<'a> {
        self.cfg
    }

    pub fn platform(&self) -> &'a dyn Platform {
        self.platform
    }

    /// The service handle of `core`
    pub fn core(&self, core: OS_COREID) -> Option<OsCore<'_, 'a>> {
        let kd = self.cores.get(core as usize)?;
        Some(OsCore { kernel: self, kd })
    }

    /// The handle of the core executing the call
    pub fn current_core(&self) -> Option<OsCore<'_, 'a>> {
        self.core(self.platform.core_id())
    }

    pub fn core_data(&self, core: OS_COREID) -> Option<&KernelData<'a>> {
        self.cores.get(core as usize)
    }

    pub fn task_dynamic(&self, task: OS_TASKID) -> Option<&OsTaskDynamic> {
        self.tasks.get(task as usize)
    }

    pub fn task_state(&self, task: OS_TASKID) -> Option<OsTaskState> {
        self.task_dynamic(task).map(OsTaskDynamic::state)
    }

    pub fn resource_dynamic(&self, resource: OS_RESOURCEID) -> Option<&OsResourceDynamic> {
        self.resources.get(resource as usize)
    }

    pub(crate) fn task_entry(&self, task: OS_TASKID) -> Option<(&'a OsTask, &OsTaskDynamic)> {
        Some((self.cfg.tasks.get(task as usize)?, self.tasks.get(task as usize)?))
    }

    pub(crate) fn resource_entry(
        &self,
        resource: OS_RESOURCEID,
    ) -> Option<(&'a OsResource, &OsResourceDynamic)> {
        Some((
            self.cfg.resources.get(resource as usize)?,
            self.resources.get(resource as usize)?,
        ))
    }
}

/// One core's view of the kernel. The services are methods on it.
#[derive(Clone, Copy)]
pub struct OsCore<'k, 'a> {
    pub(crate) kernel: &'k Kernel<'a>,
    pub(crate) kd: &'k KernelData<'a>,
}

impl<'k, 'a> OsCore<'k, 'a> {
    #[inline(always)]
    pub fn id(&self) -> OS_COREID {
        self.kd.core_id
    }

    pub fn kernel(&self) -> &'k Kernel<'a> {
        self.kernel
    }

    pub fn data(&self) -> &'k KernelData<'a> {
        self.kd
    }

    /// A task of this core, by id
    pub(crate) fn local_task(&self, task: OS_TASKID) -> Result<(&'a OsTask, &'k OsTaskDynamic), OsError> {
        let (static_part, dynamic) = self.kernel.task_entry(task).ok_or(OsError::E_OS_ID)?;
        if static_part.core != self.id() {
            return Err(OsError::E_OS_CORE);
        }
        Ok((static_part, dynamic))
    }

    pub(crate) fn local_resource(
        &self,
        resource: OS_RESOURCEID,
    ) -> Result<(&'a OsResource, &'k OsResourceDynamic), OsError> {
        let (static_part, dynamic) = self.kernel.resource_entry(resource).ok_or(OsError::E_OS_ID)?;
        if static_part.core != self.id() {
            return Err(OsError::E_OS_CORE);
        }
        Ok((static_part, dynamic))
    }

    /// The running task, for services only a task may call
    pub(crate) fn calling_task(&self) -> Result<(&'a OsTask, &'k OsTaskDynamic), OsError> {
        if self.kd.in_function.get() != crate::OsContext::Task {
            return Err(OsError::E_OS_CALLEVEL);
        }
        self.kernel
            .task_entry(self.kd.task_current.get())
            .ok_or(OsError::E_OS_CALLEVEL)
    }
}
