mod engine_stub;

pub use crate::Engine;

pub use engine_stub::{NoOpEngine, NoOpFactory};
