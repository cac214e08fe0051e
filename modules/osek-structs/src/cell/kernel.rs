use core::cell::UnsafeCell;

/// A cell for kernel variables that belong to exactly one core.
///
/// The kernel never touches another core's variables, and on its own core it
/// only touches them with interrupts locked. Under that discipline a plain
/// `UnsafeCell` is enough; this wrapper only states the contract and makes
/// the containing tables `Sync` so they can live in statics.
#[repr(transparent)]
pub struct KernelCell<T> {
    value: UnsafeCell<T>,
}

unsafe impl<T: Send> Sync for KernelCell<T> {}

impl<T> KernelCell<T> {
    #[inline]
    pub const fn new(value: T) -> Self {
        Self {
            value: UnsafeCell::new(value),
        }
    }

    /// read a copy of the value
    #[inline(always)]
    pub fn get(&self) -> T
    where
        T: Copy,
    {
        unsafe { *self.value.get() }
    }

    #[inline(always)]
    pub fn set(&self, value: T) {
        unsafe { *self.value.get() = value }
    }

    /// set and return the old value
    #[inline(always)]
    pub fn replace(&self, value: T) -> T {
        unsafe { core::mem::replace(&mut *self.value.get(), value) }
    }

    /// Run `f` on the value in place.
    ///
    /// `f` must not reach the same cell again; the kernel only calls this on
    /// leaf data (words, small structs) so there is no path for that.
    #[inline(always)]
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(unsafe { &mut *self.value.get() })
    }
}

impl<T: Default> Default for KernelCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Copy + core::fmt::Debug> core::fmt::Debug for KernelCell<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("KernelCell").field(&self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::KernelCell;

    #[test]
    fn replace_returns_previous() {
        let cell = KernelCell::new(3u16);
        assert_eq!(cell.replace(7), 3);
        assert_eq!(cell.get(), 7);
        cell.with_mut(|v| *v += 1);
        assert_eq!(cell.get(), 8);
    }
}
