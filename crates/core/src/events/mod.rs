pub mod emitter;
pub mod types;

pub use emitter::emit;
pub use types::{EventKind, JoinSource, NewEvent};
