//! Interior mutability for per-core kernel state

mod kernel;

pub use kernel::KernelCell;
