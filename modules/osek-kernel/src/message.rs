//! Inter-core messages.
//!
//! A core never reads or writes another core's kernel data. To get something
//! done on another core it puts a message into that core's inbox, raises the
//! inter-core interrupt there and waits for the reply. While waiting it keeps
//! serving its own inbox, so two cores asking each other at the same time
//! both make progress.

use heapless::Deque;
use osek_atomics::{OsAtomic, OsAtomicU32};
use osek_cfg::{OS_COREID, OS_N_CORES_MAX, OsError, OsPanic};
use spin::Mutex;

use crate::OsCore;
use crate::cpuload::CpuLoadKind;

/// Every core has at most one request outstanding, so the inbox only has to
/// hold one message per core.
pub const OS_MESSAGE_QUEUE_LEN: usize = OS_N_CORES_MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OsMessage {
    MeasureCpuLoad(CpuLoadKind),
}

pub(crate) struct MessageQueue {
    queue: Mutex<Deque<(OS_COREID, OsMessage), OS_MESSAGE_QUEUE_LEN>>,
}

impl MessageQueue {
    pub(crate) const fn new() -> Self {
        Self {
            queue: Mutex::new(Deque::new()),
        }
    }

    fn push(&self, from: OS_COREID, msg: OsMessage) -> Result<(), OsPanic> {
        self.queue
            .lock()
            .push_back((from, msg))
            .map_err(|_| OsPanic::MessageQueueFull)
    }

    fn pop(&self) -> Option<(OS_COREID, OsMessage)> {
        self.queue.lock().pop_front()
    }
}

const REPLY_IDLE: u32 = 0;
const REPLY_PENDING: u32 = 1;
const REPLY_DONE: u32 = 2;

/// Where the receiving core leaves its answer for the sender.
pub(crate) struct ReplySlot {
    state: OsAtomicU32,
    value: OsAtomicU32,
}

impl ReplySlot {
    pub(crate) const fn new() -> Self {
        Self {
            state: OsAtomicU32::new(REPLY_IDLE),
            value: OsAtomicU32::new(0),
        }
    }

    fn complete(&self, value: u32) {
        // the value has to be visible before the state says so
        self.value.store(value);
        self.state.store(REPLY_DONE);
    }
}

impl OsCore<'_, '_> {
    /// Send `msg` to core `to` and wait for its reply.
    ///
    /// Must not be called with interrupts locked: the wait would never end on
    /// a core that has to take an interrupt to answer.
    pub(crate) fn send_message_wait(&self, to: OS_COREID, msg: OsMessage) -> Result<u32, OsError> {
        let target = self.kernel.core_data(to).ok_or(OsError::E_OS_ID)?;
        let reply = &self.kd.reply;

        reply.state.store(REPLY_PENDING);
        if let Err(code) = target.inbox.push(self.id(), msg) {
            reply.state.store(REPLY_IDLE);
            return Err(self.panic_error(code));
        }
        os_log!(trace, "core {} sent {} to core {}", self.id(), msg, to);

        while reply.state.load() != REPLY_DONE {
            self.receive_messages();
            core::hint::spin_loop();
        }
        reply.state.store(REPLY_IDLE);
        Ok(reply.value.load())
    }

    /// The inter-core interrupt handler: answer every message in this core's
    /// inbox. Returns how many were handled.
    pub fn receive_messages(&self) -> usize {
        let mut handled = 0;
        while let Some((from, msg)) = self.kd.inbox.pop() {
            let value = match msg {
                OsMessage::MeasureCpuLoad(kind) => self.measure_local(kind) as u32,
            };
            match self.kernel.core_data(from) {
                Some(sender) => sender.reply.complete(value),
                None => {
                    self.os_panic(OsPanic::InvalidCoreId);
                }
            }
            handled += 1;
        }
        handled
    }
}
