//! Domain layer: the tree engine itself
//!
//! No CLI, no config loading, no rendering; serialization touches files but
//! owns every handle for the duration of the call.

pub mod arena;
pub mod error;
pub mod serial;
pub mod tree;
pub mod value;

pub use arena::{NodeArena, NodeRecord, VisitGuard};
pub use error::{DomainError, TreeResult};
pub use tree::{DumpNode, Tree, TreeDump, TreeRenderer};
pub use value::{Operator, Value};

pub use generational_arena::Index;
