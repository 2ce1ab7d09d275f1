//! Infrastructure layer: rendering and I/O-level errors

pub mod error;
pub mod render;

pub use error::{InfraError, InfraResult};
pub use render::{dot_source, DotRenderer};
