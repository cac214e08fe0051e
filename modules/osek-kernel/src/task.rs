//! Task services and the dispatcher glue around the priority queues.
//!
//! A task that is ready or running has one entry per activation in the queue
//! of its `queue_prio`. The running task's entry is always the head of the
//! queue of its current priority: dispatching raises it to `run_prio`, taking
//! a resource raises it further, and in both cases the entry moves to the
//! head of the higher queue.

use critical_section::CriticalSection;
use osek_cfg::{OS_NULLRESOURCE, OS_NULLTASK, OS_TASKID, OsError, OsTask, OsTaskState};

use crate::{IntLock, OsContext, OsCore, OsService, OsTaskDynamic};

impl<'k, 'a> OsCore<'k, 'a> {
    /// `ActivateTask`
    pub fn activate_task(&self, task: OS_TASKID) -> Result<(), OsError> {
        self.activate(task)
            .map_err(|e| self.report_error(OsService::ActivateTask, e))
    }

    fn activate(&self, task: OS_TASKID) -> Result<(), OsError> {
        if !matches!(self.kd.in_function.get(), OsContext::Task | OsContext::Isr) {
            return Err(OsError::E_OS_CALLEVEL);
        }
        let (task, dynamic) = self.local_task(task)?;
        critical_section::with(|cs| self.activate_locked(cs, task, dynamic))
    }

    pub(crate) fn activate_locked(
        &self,
        cs: CriticalSection<'_>,
        task: &OsTask,
        dynamic: &OsTaskDynamic,
    ) -> Result<(), OsError> {
        let state = dynamic.state.get();
        match state {
            OsTaskState::Quarantined => return Err(OsError::E_OS_STATE),
            OsTaskState::Suspended => {}
            _ if dynamic.n_act.get() >= task.max_act => return Err(OsError::E_OS_LIMIT),
            _ => {}
        }

        self.kd
            .enqueue(cs, task.task_id, task.queue_prio)
            .map_err(|code| self.panic_error(code))?;

        if state == OsTaskState::Suspended {
            dynamic.state.set(OsTaskState::New);
            dynamic.prio.set(task.queue_prio);
            dynamic.p_events.set(0);
            dynamic.w_events.set(0);
        } else {
            dynamic.n_act.with_mut(|n| *n += 1);
        }
        os_log!(debug, "task {} activated, {} pending", task.task_id, dynamic.n_act.get());

        self.kd.find_highest_task(cs);
        Ok(())
    }

    /// `TerminateTask`: the running task ends its current activation.
    ///
    /// The caller is expected to dispatch afterwards.
    pub fn terminate_task(&self) -> Result<(), OsError> {
        self.terminate()
            .map_err(|e| self.report_error(OsService::TerminateTask, e))
    }

    fn terminate(&self) -> Result<(), OsError> {
        let (task, dynamic) = self.calling_task()?;
        if dynamic.last_res.get() != OS_NULLRESOURCE {
            return Err(OsError::E_OS_RESOURCE);
        }

        critical_section::with(|cs| {
            self.kd.remove_priority_queue_head(cs, dynamic.prio.get());
            dynamic.prio.set(task.queue_prio);
            dynamic.w_events.set(0);
            let pending = dynamic.n_act.get();
            if pending > 0 {
                dynamic.n_act.set(pending - 1);
                dynamic.state.set(OsTaskState::New);
            } else {
                dynamic.state.set(OsTaskState::Suspended);
            }
            self.kd.task_current.set(OS_NULLTASK);
            self.kd.in_function.set(OsContext::Idle);
            self.kd.find_highest_task(cs);
        });
        os_log!(debug, "task {} terminated", task.task_id);
        Ok(())
    }

    /// `OS_KillTask`: take `task` out of the system, whatever it is doing.
    ///
    /// Its resources are freed, every queued activation is removed and it
    /// ends up in `final_state`, `Suspended` or `Quarantined`.
    pub fn kill_task(&self, task: OS_TASKID, final_state: OsTaskState) -> Result<(), OsError> {
        if !matches!(final_state, OsTaskState::Suspended | OsTaskState::Quarantined) {
            return Err(OsError::E_OS_VALUE);
        }
        let (task, dynamic) = self.local_task(task)?;
        let lock = IntLock::acquire();
        self.kill_locked(lock.token(), task, dynamic, final_state);
        Ok(())
    }

    pub(crate) fn kill_locked(
        &self,
        cs: CriticalSection<'_>,
        task: &OsTask,
        dynamic: &OsTaskDynamic,
        final_state: OsTaskState,
    ) {
        os_log!(info, "killing task {}", task.task_id);

        // free the resource chain
        let mut resource = dynamic.last_res.replace(OS_NULLRESOURCE);
        while resource != OS_NULLRESOURCE {
            let Some((_, r)) = self.kernel.resource_entry(resource) else {
                break;
            };
            r.taken_by.set(OS_NULLTASK);
            resource = r.next.replace(OS_NULLRESOURCE);
        }

        self.kd.dequeue_all(cs, task, dynamic);
        dynamic.prio.set(task.queue_prio);
        dynamic.p_events.set(0);
        dynamic.w_events.set(0);
        dynamic.state.set(final_state);

        if self.kd.task_current.get() == task.task_id {
            self.kd.task_current.set(OS_NULLTASK);
            if self.kd.in_function.get() == OsContext::Task {
                self.kd.in_function.set(OsContext::Idle);
            }
        }
    }

    /// Make the head of the queues the running task and return it,
    /// OS_NULLTASK when the core goes idle.
    pub fn dispatch(&self) -> OS_TASKID {
        critical_section::with(|cs| self.dispatch_locked(cs))
    }

    pub(crate) fn dispatch_locked(&self, cs: CriticalSection<'_>) -> OS_TASKID {
        if self.kd.in_function.get() == OsContext::Shutdown {
            return OS_NULLTASK;
        }
        let head = self.kd.task_queue_head.get();
        let current = self.kd.task_current.get();
        if head != current {
            self.switch_to(cs, current, head);
        }
        let running = self.kd.task_current.get();
        if running == OS_NULLTASK && self.kd.in_function.get() == OsContext::Task {
            // the task was taken away under an interrupt that returned to it
            self.kd.in_function.set(OsContext::Idle);
        }

        // a running task keeps the core out of idle for the cpu load
        let busy = running != OS_NULLTASK;
        if self.kd.task_busy.replace(busy) != busy {
            if let Some(load) = self.kd.cpu_load.as_ref() {
                let now = self.kernel.platform.timestamp();
                if busy {
                    load.leave_idle_state(now);
                } else {
                    load.enter_idle_state(now);
                }
            }
        }
        running
    }

    /// One pass of the idle loop: answer the other cores, run whatever became
    /// ready, and otherwise wait for the next interrupt.
    pub fn idle(&self) -> OS_TASKID {
        self.receive_messages();
        let next = self.dispatch();
        if next == OS_NULLTASK {
            self.kernel.platform.enter_idle_state();
        }
        next
    }

    fn switch_to(&self, cs: CriticalSection<'_>, current: OS_TASKID, head: OS_TASKID) {
        if let Some((_, preempted)) = self.kernel.task_entry(current) {
            if preempted.state.get() == OsTaskState::Running {
                preempted.state.set(OsTaskState::Ready);
            }
        }

        let Some((task, dynamic)) = self.kernel.task_entry(head) else {
            self.kd.task_current.set(OS_NULLTASK);
            if self.kd.in_function.get() == OsContext::Task {
                self.kd.in_function.set(OsContext::Idle);
            }
            return;
        };

        let prio = dynamic.prio.get();
        if prio < task.run_prio {
            if let Err(code) = self.kd.requeue(cs, head, prio, task.run_prio) {
                self.os_panic(code);
                return;
            }
            dynamic.prio.set(task.run_prio);
            self.kd.find_highest_task(cs);
        }

        dynamic.state.set(OsTaskState::Running);
        self.kd.task_current.set(head);
        if self.kd.in_function.get() == OsContext::Idle {
            self.kd.in_function.set(OsContext::Task);
        }
        os_log!(trace, "core {} dispatched task {}", self.id(), head);
    }

    /// Entry of a category-2 interrupt. Returns the interrupted context,
    /// which goes back to [`leave_isr`](Self::leave_isr).
    pub fn enter_isr(&self) -> OsContext {
        let now = self.kernel.platform.timestamp();
        critical_section::with(|_| {
            let interrupted = self.kd.in_function.get();
            if interrupted == OsContext::Shutdown {
                return interrupted;
            }
            self.kd.isr_nesting.with_mut(|n| *n += 1);
            if let Some(load) = self.kd.cpu_load.as_ref() {
                load.leave_idle_state(now);
            }
            self.kd.in_function.set(OsContext::Isr);
            interrupted
        })
    }

    /// Exit of a category-2 interrupt. The outermost exit dispatches; the
    /// task that runs afterwards is returned.
    pub fn leave_isr(&self, interrupted: OsContext) -> OS_TASKID {
        let now = self.kernel.platform.timestamp();
        critical_section::with(|cs| {
            if interrupted == OsContext::Shutdown {
                return OS_NULLTASK;
            }
            let nesting = self.kd.isr_nesting.with_mut(|n| {
                *n = n.saturating_sub(1);
                *n
            });
            if let Some(load) = self.kd.cpu_load.as_ref() {
                load.enter_idle_state(now);
            }
            self.kd.in_function.set(interrupted);
            if nesting == 0 && matches!(interrupted, OsContext::Task | OsContext::Idle) {
                self.dispatch_locked(cs)
            } else {
                self.kd.task_current.get()
            }
        })
    }
}
