//! Resources under the priority ceiling protocol.

use osek_cfg::{OS_NULLRESOURCE, OS_NULLTASK, OS_RESOURCEID, OsError};

use crate::{OsCore, OsService};

impl OsCore<'_, '_> {
    /// `GetResource`: the running task takes `resource` and is raised to
    /// its ceiling.
    pub fn get_resource(&self, resource: OS_RESOURCEID) -> Result<(), OsError> {
        self.take_resource(resource)
            .map_err(|e| self.report_error(OsService::GetResource, e))
    }

    fn take_resource(&self, resource: OS_RESOURCEID) -> Result<(), OsError> {
        let (task, dynamic) = self.calling_task()?;
        let (res, rd) = self.local_resource(resource)?;
        let ceiling = res.queue_prio(self.kd.cfg.max_prio);
        if rd.taken_by.get() != OS_NULLTASK || ceiling < task.queue_prio {
            return Err(OsError::E_OS_ACCESS);
        }

        critical_section::with(|cs| {
            let prio = dynamic.prio.get();
            if ceiling > prio {
                // requeue up
                self.kd
                    .requeue(cs, task.task_id, prio, ceiling)
                    .map_err(|code| self.panic_error(code))?;
                dynamic.prio.set(ceiling);
                self.kd.find_highest_task(cs);
            }
            rd.taken_by.set(task.task_id);
            rd.last_prio.set(prio);
            rd.next.set(dynamic.last_res.replace(resource));
            event_log!(debug, "task {} took resource {} at prio {}", task.task_id, resource, ceiling);
            Ok(())
        })
    }

    /// `ReleaseResource`: give back the resource taken last. The task drops
    /// to the priority it had before taking it.
    pub fn release_resource(&self, resource: OS_RESOURCEID) -> Result<(), OsError> {
        self.give_resource(resource)
            .map_err(|e| self.report_error(OsService::ReleaseResource, e))
    }

    fn give_resource(&self, resource: OS_RESOURCEID) -> Result<(), OsError> {
        let (task, dynamic) = self.calling_task()?;
        let (_, rd) = self.local_resource(resource)?;
        if rd.taken_by.get() != task.task_id {
            return Err(OsError::E_OS_NOFUNC);
        }
        // resources go back in the reverse order they were taken
        if dynamic.last_res.get() != resource {
            return Err(OsError::E_OS_NOFUNC);
        }

        critical_section::with(|cs| {
            let prio = dynamic.prio.get();
            let back = rd.last_prio.get();
            if back < prio {
                // requeue down
                self.kd
                    .requeue(cs, task.task_id, prio, back)
                    .map_err(|code| self.panic_error(code))?;
                dynamic.prio.set(back);
                self.kd.find_highest_task(cs);
            }
            rd.taken_by.set(OS_NULLTASK);
            dynamic.last_res.set(rd.next.replace(OS_NULLRESOURCE));
            event_log!(debug, "task {} released resource {}", task.task_id, resource);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use osek_cfg::generator::ConfigGenerator;
    use osek_cfg::{ConformanceClass, OS_NULLTASK, OsError, OsResource, OsTask, TaskFlags};
    use osek_platform::sim::{SimPlatform, SimTimer};

    use crate::{Kernel, OSStartOs};

    #[test]
    fn nested_resources_restore_priorities() {
        let generated = ConfigGenerator::new(1, ConformanceClass::BCC1)
            .task(OsTask::new(0, 0, 1).with_flags(TaskFlags::AUTOSTART))
            .task(OsTask::new(1, 0, 3))
            .resource(OsResource::new(0, 0, 2))
            .resource(OsResource::new(1, 0, 4))
            .build()
            .unwrap();
        let cfg = generated.config();
        let timer = SimTimer::new();
        let platform = SimPlatform::new(0, &timer);
        let kernel = Kernel::new(&cfg, &platform);
        let core = kernel.core(0).unwrap();
        OSStartOs(core).unwrap();
        assert_eq!(core.dispatch(), 0);
        let task = kernel.task_dynamic(0).unwrap();

        core.get_resource(0).unwrap();
        assert_eq!(task.prio(), 2);
        core.get_resource(1).unwrap();
        assert_eq!(task.prio(), 4);
        assert_eq!(core.get_resource(1), Err(OsError::E_OS_ACCESS));

        // task 1 is ready but must wait for the ceiling to drop
        core.activate_task(1).unwrap();
        assert_eq!(core.dispatch(), 0);
        assert_eq!(core.release_resource(0), Err(OsError::E_OS_NOFUNC));
        core.release_resource(1).unwrap();
        assert_eq!(task.prio(), 2);
        assert_eq!(core.data().task_queue_head(), 1);
        assert_eq!(core.dispatch(), 1);

        core.terminate_task().unwrap();
        assert_eq!(core.dispatch(), 0);
        core.release_resource(0).unwrap();
        assert_eq!(task.prio(), 1);
        assert_eq!(kernel.resource_dynamic(0).unwrap().taken_by(), OS_NULLTASK);
        assert_eq!(core.terminate_task(), Ok(()));
    }

    #[test]
    fn terminate_while_holding_a_resource_fails() {
        let generated = ConfigGenerator::new(1, ConformanceClass::BCC1)
            .task(OsTask::new(0, 0, 1).with_flags(TaskFlags::AUTOSTART))
            .resource(OsResource::new(0, 0, 2))
            .build()
            .unwrap();
        let cfg = generated.config();
        let timer = SimTimer::new();
        let platform = SimPlatform::new(0, &timer);
        let kernel = Kernel::new(&cfg, &platform);
        let core = kernel.core(0).unwrap();
        OSStartOs(core).unwrap();
        core.dispatch();

        core.get_resource(0).unwrap();
        assert_eq!(core.terminate_task(), Err(OsError::E_OS_RESOURCE));
        assert_eq!(core.get_resource(5), Err(OsError::E_OS_ID));
    }
}
