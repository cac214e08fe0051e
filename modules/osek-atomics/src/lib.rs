#![cfg_attr(not(test), no_std)]

//! Atomic objects shared between cores, or between an ISR and a task.
//!
//! This is the only sanctioned way for kernel code to share mutable data
//! across cores. Every operation is sequentially consistent; none of the
//! call sites (cross-core messaging, the compare-exchange retry loops below)
//! is written for anything weaker.
//!
//! Objects must be created with [`OsAtomicU32::new`] / [`OsAtomicU64::new`]
//! or given a value with [`OsAtomic::init`] before they are shared. There is
//! no "uninitialized" state to check for at runtime.
//!
//! `fetch_or`, `fetch_and` and `fetch_xor` are built from
//! [`OsAtomic::compare_exchange`] as retry loops, so they behave the same on
//! every target whether or not it has a native instruction for them.

use core::sync::atomic::Ordering;

/// The atomic object API.
pub trait OsAtomic {
    type Value: Copy + Eq;

    /// Give the object its initial value. Not atomic with respect to other
    /// accessors: call it before the object is shared.
    fn init(&self, value: Self::Value);

    fn load(&self) -> Self::Value;

    fn store(&self, value: Self::Value);

    /// Store `value` and return the previous one
    fn exchange(&self, value: Self::Value) -> Self::Value;

    /// If the object holds `*expected`, store `desired` and return true.
    /// Otherwise copy the current value into `*expected` and return false.
    fn compare_exchange(&self, expected: &mut Self::Value, desired: Self::Value) -> bool;

    fn fetch_add(&self, operand: Self::Value) -> Self::Value;

    fn fetch_sub(&self, operand: Self::Value) -> Self::Value;

    fn fetch_or(&self, operand: Self::Value) -> Self::Value;

    fn fetch_and(&self, operand: Self::Value) -> Self::Value;

    fn fetch_xor(&self, operand: Self::Value) -> Self::Value;

    /// Set the object to 1 and return whether it was set before
    fn test_and_set_flag(&self) -> bool;

    fn clear_flag(&self);
}

/// Full memory fence
#[inline(always)]
pub fn thread_fence() {
    core::sync::atomic::fence(Ordering::SeqCst);
}

macro_rules! os_atomic {
    ($(#[$attr:meta])* $name:ident, $raw:ty, $value:ty) => {
        $(#[$attr])*
        #[repr(transparent)]
        pub struct $name {
            cell: $raw,
        }

        impl $name {
            /// The static initializer
            pub const fn new(value: $value) -> Self {
                Self { cell: <$raw>::new(value) }
            }

            /// Apply `f` atomically and return the old value.
            #[inline]
            fn fetch_update_with(&self, operand: $value, f: impl Fn($value, $value) -> $value) -> $value {
                let mut expected = self.load();
                loop {
                    let desired = f(expected, operand);
                    if self.compare_exchange(&mut expected, desired) {
                        return expected;
                    }
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new(0)
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.load()).finish()
            }
        }

        impl OsAtomic for $name {
            type Value = $value;

            #[inline]
            fn init(&self, value: $value) {
                self.cell.store(value, Ordering::SeqCst);
            }

            #[inline]
            fn load(&self) -> $value {
                self.cell.load(Ordering::SeqCst)
            }

            #[inline]
            fn store(&self, value: $value) {
                self.cell.store(value, Ordering::SeqCst);
            }

            #[inline]
            fn exchange(&self, value: $value) -> $value {
                self.cell.swap(value, Ordering::SeqCst)
            }

            #[inline]
            fn compare_exchange(&self, expected: &mut $value, desired: $value) -> bool {
                match self
                    .cell
                    .compare_exchange(*expected, desired, Ordering::SeqCst, Ordering::SeqCst)
                {
                    Ok(_) => true,
                    Err(current) => {
                        *expected = current;
                        false
                    }
                }
            }

            #[inline]
            fn fetch_add(&self, operand: $value) -> $value {
                self.cell.fetch_add(operand, Ordering::SeqCst)
            }

            #[inline]
            fn fetch_sub(&self, operand: $value) -> $value {
                self.cell.fetch_sub(operand, Ordering::SeqCst)
            }

            fn fetch_or(&self, operand: $value) -> $value {
                self.fetch_update_with(operand, |old, op| old | op)
            }

            fn fetch_and(&self, operand: $value) -> $value {
                self.fetch_update_with(operand, |old, op| old & op)
            }

            fn fetch_xor(&self, operand: $value) -> $value {
                self.fetch_update_with(operand, |old, op| old ^ op)
            }

            #[inline]
            fn test_and_set_flag(&self) -> bool {
                self.exchange(1) != 0
            }

            #[inline]
            fn clear_flag(&self) {
                self.store(0);
            }
        }
    };
}

os_atomic!(
    /// 32-bit atomic object
    OsAtomicU32,
    portable_atomic::AtomicU32,
    u32
);

os_atomic!(
    /// 64-bit atomic object. Targets without 64-bit atomics get them through
    /// `portable-atomic`'s fallback.
    OsAtomicU64,
    portable_atomic::AtomicU64,
    u64
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_exchange_reports_the_current_value() {
        let obj = OsAtomicU32::new(5);
        let mut expected = 4;
        assert!(!obj.compare_exchange(&mut expected, 9));
        assert_eq!(expected, 5);
        assert!(obj.compare_exchange(&mut expected, 9));
        assert_eq!(obj.load(), 9);
    }

    #[test]
    fn boolean_ops_return_the_old_value() {
        let obj = OsAtomicU64::new(0b1100);
        assert_eq!(obj.fetch_or(0b0011), 0b1100);
        assert_eq!(obj.fetch_and(0b0110), 0b1111);
        assert_eq!(obj.fetch_xor(0b0101), 0b0110);
        assert_eq!(obj.load(), 0b0011);
    }

    #[test]
    fn flags() {
        let flag = OsAtomicU32::default();
        assert!(!flag.test_and_set_flag());
        assert!(flag.test_and_set_flag());
        flag.clear_flag();
        assert_eq!(flag.load(), 0);
    }

    #[test]
    fn arithmetic_wraps() {
        let obj = OsAtomicU32::new(u32::MAX);
        assert_eq!(obj.fetch_add(2), u32::MAX);
        assert_eq!(obj.fetch_sub(3), 1);
        assert_eq!(obj.exchange(7), u32::MAX - 1);
    }
}
