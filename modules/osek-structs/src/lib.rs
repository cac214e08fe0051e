#![cfg_attr(not(test), no_std)]

//! Shared data structures for the kernel crates.

pub mod cell;
