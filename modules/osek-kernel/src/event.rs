//! Events of extended tasks.

use osek_cfg::{OS_EVENTMASK, OS_NULLRESOURCE, OS_NULLTASK, OS_TASKID, OsError, OsTaskState};

use crate::{OsContext, OsCore, OsService};

impl OsCore<'_, '_> {
    /// `WaitEvent`: block the running task until one of the events in
    /// `mask` is set. Returns at once if one already is.
    ///
    /// The caller dispatches afterwards when the task went to WAITING.
    pub fn wait_event(&self, mask: OS_EVENTMASK) -> Result<(), OsError> {
        self.wait(mask).map_err(|e| self.report_error(OsService::WaitEvent, e))
    }

    fn wait(&self, mask: OS_EVENTMASK) -> Result<(), OsError> {
        let (task, dynamic) = self.calling_task()?;
        if !task.is_extended() {
            return Err(OsError::E_OS_ACCESS);
        }
        if mask == 0 {
            return Err(OsError::E_OS_VALUE);
        }
        if dynamic.last_res.get() != OS_NULLRESOURCE {
            return Err(OsError::E_OS_RESOURCE);
        }

        critical_section::with(|cs| {
            if dynamic.p_events.get() & mask != 0 {
                return;
            }
            dynamic.w_events.set(mask);
            dynamic.state.set(OsTaskState::Waiting);
            self.kd.remove_priority_queue_head(cs, dynamic.prio.get());
            dynamic.prio.set(task.queue_prio);
            self.kd.task_current.set(OS_NULLTASK);
            self.kd.in_function.set(OsContext::Idle);
            self.kd.find_highest_task(cs);
            event_log!(debug, "task {} waits for {:x}", task.task_id, mask);
        });
        Ok(())
    }

    /// `SetEvent`: set `mask` in the pending events of `task` and wake it up
    /// if it waits for any of them.
    pub fn set_event(&self, task: OS_TASKID, mask: OS_EVENTMASK) -> Result<(), OsError> {
        self.set(task, mask)
            .map_err(|e| self.report_error(OsService::SetEvent, e))
    }

    fn set(&self, task: OS_TASKID, mask: OS_EVENTMASK) -> Result<(), OsError> {
        if !matches!(self.kd.in_function.get(), OsContext::Task | OsContext::Isr) {
            return Err(OsError::E_OS_CALLEVEL);
        }
        let (task, dynamic) = self.local_task(task)?;
        if !task.is_extended() {
            return Err(OsError::E_OS_ACCESS);
        }

        critical_section::with(|cs| {
            if matches!(
                dynamic.state.get(),
                OsTaskState::Suspended | OsTaskState::Quarantined
            ) {
                return Err(OsError::E_OS_STATE);
            }
            let pending = dynamic.p_events.get() | mask;
            dynamic.p_events.set(pending);
            if dynamic.state.get() == OsTaskState::Waiting && pending & dynamic.w_events.get() != 0 {
                self.kd
                    .enqueue(cs, task.task_id, task.queue_prio)
                    .map_err(|code| self.panic_error(code))?;
                dynamic.w_events.set(0);
                dynamic.state.set(OsTaskState::Ready);
                self.kd.find_highest_task(cs);
                event_log!(debug, "task {} woken up", task.task_id);
            }
            Ok(())
        })
    }

    /// `GetEvent`: the pending events of `task`.
    pub fn get_event(&self, task: OS_TASKID) -> Result<OS_EVENTMASK, OsError> {
        self.pending_events(task)
            .map_err(|e| self.report_error(OsService::GetEvent, e))
    }

    fn pending_events(&self, task: OS_TASKID) -> Result<OS_EVENTMASK, OsError> {
        if !matches!(self.kd.in_function.get(), OsContext::Task | OsContext::Isr) {
            return Err(OsError::E_OS_CALLEVEL);
        }
        let (task, dynamic) = self.local_task(task)?;
        if !task.is_extended() {
            return Err(OsError::E_OS_ACCESS);
        }
        if matches!(
            dynamic.state.get(),
            OsTaskState::Suspended | OsTaskState::Quarantined
        ) {
            return Err(OsError::E_OS_STATE);
        }
        Ok(dynamic.p_events.get())
    }

    /// `ClearEvent`: the running task clears `mask` from its own events.
    pub fn clear_event(&self, mask: OS_EVENTMASK) -> Result<(), OsError> {
        self.clear(mask)
            .map_err(|e| self.report_error(OsService::ClearEvent, e))
    }

    fn clear(&self, mask: OS_EVENTMASK) -> Result<(), OsError> {
        let (task, dynamic) = self.calling_task()?;
        if !task.is_extended() {
            return Err(OsError::E_OS_ACCESS);
        }
        dynamic.p_events.with_mut(|p| *p &= !mask);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use osek_cfg::generator::ConfigGenerator;
    use osek_cfg::{
        ConformanceClass, OS_NULLTASK, OsError, OsResource, OsTask, OsTaskState, TaskFlags,
    };
    use osek_platform::sim::{SimPlatform, SimTimer};

    use crate::{Kernel, OSStartOs, OsContext};

    fn generated() -> osek_cfg::generator::GeneratedConfig {
        ConfigGenerator::new(1, ConformanceClass::ECC1)
            .task(OsTask::new(0, 0, 2).with_flags(TaskFlags::EXTENDED | TaskFlags::AUTOSTART))
            .task(OsTask::new(1, 0, 1))
            .resource(OsResource::new(0, 0, 3))
            .build()
            .unwrap()
    }

    #[test]
    fn wait_and_wake() {
        let generated = generated();
        let cfg = generated.config();
        let timer = SimTimer::new();
        let platform = SimPlatform::new(0, &timer);
        let kernel = Kernel::new(&cfg, &platform);
        let core = kernel.core(0).unwrap();
        OSStartOs(core).unwrap();
        assert_eq!(core.dispatch(), 0);

        core.activate_task(1).unwrap();
        core.wait_event(0b10).unwrap();
        assert_eq!(kernel.task_state(0), Some(OsTaskState::Waiting));
        assert!(!core.data().priority_bit_is_set(2));
        assert_eq!(core.dispatch(), 1);

        // the wrong event does not wake it
        core.set_event(0, 0b01).unwrap();
        assert_eq!(kernel.task_state(0), Some(OsTaskState::Waiting));
        assert_eq!(core.get_event(0), Ok(0b01));

        let interrupted = core.enter_isr();
        core.set_event(0, 0b10).unwrap();
        assert_eq!(core.leave_isr(interrupted), 0);
        assert_eq!(kernel.task_state(1), Some(OsTaskState::Ready));

        // both events pending: no waiting this time
        core.wait_event(0b10).unwrap();
        assert_eq!(core.data().current_task(), 0);
        core.clear_event(0b11).unwrap();
        assert_eq!(core.get_event(0), Ok(0));
    }

    #[test]
    fn wait_event_errors() {
        let generated = generated();
        let cfg = generated.config();
        let timer = SimTimer::new();
        let platform = SimPlatform::new(0, &timer);
        let kernel = Kernel::new(&cfg, &platform);
        let core = kernel.core(0).unwrap();

        assert_eq!(core.wait_event(1), Err(OsError::E_OS_CALLEVEL));
        OSStartOs(core).unwrap();
        core.dispatch();

        assert_eq!(core.wait_event(0), Err(OsError::E_OS_VALUE));
        core.get_resource(0).unwrap();
        assert_eq!(core.wait_event(1), Err(OsError::E_OS_RESOURCE));
        core.release_resource(0).unwrap();

        let interrupted = core.enter_isr();
        assert_eq!(core.data().in_function(), OsContext::Isr);
        assert_eq!(core.wait_event(1), Err(OsError::E_OS_CALLEVEL));
        assert_eq!(core.set_event(1, 1), Err(OsError::E_OS_ACCESS));
        assert_eq!(core.get_event(1), Err(OsError::E_OS_ACCESS));
        core.leave_isr(interrupted);

        // a basic task may not wait
        core.activate_task(1).unwrap();
        core.terminate_task().unwrap();
        assert_eq!(core.dispatch(), 1);
        assert_eq!(core.wait_event(1), Err(OsError::E_OS_ACCESS));
        core.terminate_task().unwrap();
        assert_eq!(core.dispatch(), OS_NULLTASK);
        assert_eq!(core.set_event(0, 1), Err(OsError::E_OS_CALLEVEL));
    }
}
