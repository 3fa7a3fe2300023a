//! Tripwire — BLAKE3 content hashing and change detection for watch mode.

pub mod hasher;
pub mod watch;
