//! Interrupt locking.

use core::marker::PhantomData;

use critical_section::{CriticalSection, RestoreState};

/// Interrupts stay locked for as long as the guard lives.
///
/// This is the scoped form of `critical_section::with` for code paths that
/// lock in one function and hand the token down through several others.
/// Guards nest; they must be dropped in reverse order of acquisition, which
/// keeping them on the stack guarantees.
pub struct IntLock {
    state: RestoreState,
    // must be released on the core that locked
    _not_send: PhantomData<*mut ()>,
}

impl IntLock {
    #[inline]
    pub fn acquire() -> Self {
        Self {
            state: unsafe { critical_section::acquire() },
            _not_send: PhantomData,
        }
    }

    /// The token queue operations ask for.
    #[inline(always)]
    pub fn token(&self) -> CriticalSection<'_> {
        // the guard outlives the token, so interrupts stay locked for its lifetime
        unsafe { CriticalSection::new() }
    }
}

impl Drop for IntLock {
    #[inline]
    fn drop(&mut self) {
        unsafe { critical_section::release(self.state) }
    }
}

#[cfg(test)]
mod tests {
    use super::IntLock;

    #[test]
    fn guards_nest() {
        let outer = IntLock::acquire();
        {
            let inner = IntLock::acquire();
            let _cs = inner.token();
        }
        let _cs = outer.token();
    }
}
