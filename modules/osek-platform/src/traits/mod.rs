//! Platform traits

pub mod platform;

pub use platform::Platform;
