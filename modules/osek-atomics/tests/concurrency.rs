//! Concurrent use of the atomic objects from several threads, standing in
//! for several cores.

use std::sync::Arc;
use std::thread;

use osek_atomics::{OsAtomic, OsAtomicU32, OsAtomicU64, thread_fence};

#[test]
fn fetch_or_with_disjoint_masks_sets_every_bit() {
    const THREADS: u32 = 32;
    let obj = Arc::new(OsAtomicU32::new(0));
    let handles: Vec<_> = (0..THREADS)
        .map(|bit| {
            let obj = Arc::clone(&obj);
            thread::spawn(move || {
                obj.fetch_or(1 << bit);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(obj.load(), u32::MAX);
}

#[test]
fn fetch_and_clears_every_bit_exactly_once() {
    let obj = Arc::new(OsAtomicU64::new(u64::MAX));
    let handles: Vec<_> = (0..64u32)
        .map(|bit| {
            let obj = Arc::clone(&obj);
            thread::spawn(move || {
                // each thread owns one bit and toggles it many times before clearing it
                for _ in 0..100 {
                    obj.fetch_xor(1 << bit);
                }
                let before = obj.fetch_and(!(1u64 << bit));
                assert_ne!(before & (1 << bit), 0);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(obj.load(), 0);
}

#[test]
fn fetch_add_is_not_torn() {
    let obj = Arc::new(OsAtomicU64::new(0));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let obj = Arc::clone(&obj);
            thread::spawn(move || {
                for _ in 0..10_000 {
                    obj.fetch_add(1);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    thread_fence();
    assert_eq!(obj.load(), 80_000);
}

#[test]
fn test_and_set_admits_a_single_owner() {
    let flag = Arc::new(OsAtomicU32::new(0));
    let winners = Arc::new(OsAtomicU32::new(0));
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let flag = Arc::clone(&flag);
            let winners = Arc::clone(&winners);
            thread::spawn(move || {
                if !flag.test_and_set_flag() {
                    winners.fetch_add(1);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(winners.load(), 1);
}
