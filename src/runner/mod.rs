//! SP-008: Scoped process handle for run mode.
//!
//! At most one artifact process is alive per runner. Starting a new one
//! always stops the previous process group first, and stopping is safe when
//! the process has already exited.

pub mod process;

pub use process::Runner;
