/*
*********************************************************************************************************
*                                             ERROR CODES
*********************************************************************************************************
*/

/// Status codes returned by the kernel services.
///
/// A service that succeeds returns `Ok`; these are the `E_OS_*` codes of
/// the failure cases. They are recoverable per task: the caller sees the code
/// and the protection hook may decide to quarantine it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OsError {
    /// the object is not accessible from the caller's context
    E_OS_ACCESS = 1,
    /// the service was called from the wrong context
    E_OS_CALLEVEL = 2,
    /// invalid object id
    E_OS_ID = 3,
    /// too many activations
    E_OS_LIMIT = 4,
    /// the object is not in a state the service can work on
    E_OS_NOFUNC = 5,
    /// the caller still holds a resource, or the resource is taken
    E_OS_RESOURCE = 6,
    /// the target is in the wrong state
    E_OS_STATE = 7,
    /// a parameter is out of range
    E_OS_VALUE = 8,
    /// the object lives on a core the service cannot reach
    E_OS_CORE = 9,
}

impl OsError {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// What the protection hook wants the kernel to do about an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtectionAction {
    /// report the error and carry on
    Continue,
    /// kill the calling task, it becomes QUARANTINED
    QuarantineCaller,
    /// stop the core
    Shutdown,
}

/// Fatal kernel errors.
///
/// The `SCHK_*` codes come from the startup checks and each names one
/// violated property of the generated priority-queue tables. The others are
/// runtime consistency failures. None of them is recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OsPanic {
    /// the number of priority queues is not highest used priority + 1
    SCHK_WrongNumberOfPriorityQueues = 1,
    /// a priority level does not have exactly the slots its tasks need
    SCHK_WrongNumberOfQueueEntries,
    SCHK_SingleEntryQueueHasDynamicVars,
    SCHK_MultiEntryQueueHasNoDynamicVars,
    /// multi-slot queues need conformance class BCC2/ECC2
    SCHK_MultiEntryQueueNotCC2,
    /// two queues point at the same dynamic variables
    SCHK_SharedQueueDynamicVars,
    SCHK_QueueOutOfBounds,
    SCHK_OverlappingQueues,
    SCHK_GapInQueues,
    SCHK_WrongMasterBit,
    SCHK_WrongSlaveBit,
    SCHK_WrongSlaveWord,
    /// an activation was enqueued into a full priority queue
    QueueOverflow,
    /// a core's inter-core message queue overflowed
    MessageQueueFull,
    /// a core id that the configuration does not describe
    InvalidCoreId,
}

impl OsPanic {
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// true for the codes raised by the startup checks
    pub const fn is_startup_check(self) -> bool {
        (self as u8) <= (Self::SCHK_WrongSlaveWord as u8)
    }
}
