/*
*********************************************************************************************************
*                                              STARTUP
*********************************************************************************************************
*/

use osek_cfg::{OsPanic, TaskFlags};

use crate::{IntLock, OsContext, OsCore, startup_checks_queue};

/// Run the startup checks and panic the core on the first violation.
///
/// Only reads the configuration, so it can run any number of times.
pub fn OSStartupChecksQueue(core: OsCore<'_, '_>) -> Result<(), OsPanic> {
    startup_checks_queue(core.kernel.cfg).map_err(|code| core.os_panic(code))
}

/// `StartOS` on one core.
///
/// Checks the tables, starts the cpu-load measurement, activates the
/// autostart tasks of the core and runs the startup hooks. Afterwards
/// `task_queue_head` names the first task to dispatch.
pub fn OSStartOs(core: OsCore<'_, '_>) -> Result<(), OsPanic> {
    OSStartupChecksQueue(core)?;
    os_log!(info, "starting core {}", core.id());

    let now = core.kernel.platform.timestamp();
    if let Some(load) = core.kd.cpu_load.as_ref() {
        critical_section::with(|_| load.init(now));
    }

    {
        let lock = IntLock::acquire();
        let cs = lock.token();
        for task in core.kernel.cfg.core_tasks(core.id()) {
            if !task.flags.contains(TaskFlags::AUTOSTART) {
                continue;
            }
            let Some((task, dynamic)) = core.kernel.task_entry(task.task_id) else {
                continue;
            };
            if core.activate_locked(cs, task, dynamic).is_err() {
                return Err(core.kd.panic_code.get().unwrap_or(OsPanic::QueueOverflow));
            }
        }
    }

    core.call_startup_hook();
    critical_section::with(|cs| core.kd.find_highest_task(cs));
    Ok(())
}

impl OsCore<'_, '_> {
    /// Run the global startup hook, then the startup hook of every
    /// application on this core.
    pub(crate) fn call_startup_hook(&self) {
        let caller = self.kd.in_function.replace(OsContext::StartupHook);
        if let Some(hook) = self.kernel.cfg.hooks.startup {
            hook(self.id());
        }
        for app in self.kernel.cfg.apps.iter().filter(|a| a.core == self.id()) {
            if let Some(hook) = app.startup_hook {
                os_log!(debug, "startup hook of application {}", app.app_id);
                hook(app.app_id);
            }
        }
        self.kd.in_function.set(caller);
    }
}
