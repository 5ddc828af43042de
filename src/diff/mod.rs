pub mod apply;
pub mod generator;
pub mod types;

pub use apply::apply_hunks;
pub use generator::DiffGenerator;
pub use types::{DiffError, EditOp, FileDiff, Hunk};
