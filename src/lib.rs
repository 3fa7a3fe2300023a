//! Splice — assemble one source file from many.
//!
//! `#:section` includes, `#:if`/`#:else`/`#:endif` blocks driven by defined
//! symbols, and a `0o ---` … `--- o0` manifest carrying build settings.

pub mod cli;
pub mod core;
pub mod runner;
pub mod tripwire;
