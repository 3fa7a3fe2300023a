//! Core assembly logic — manifest parsing, directive expansion, artifact settings.

pub mod artifact;
pub mod assembler;
pub mod error;
pub mod manifest;
pub mod types;

pub use assembler::{assemble, BuildContext};
pub use error::BuildError;
pub use manifest::Manifest;
