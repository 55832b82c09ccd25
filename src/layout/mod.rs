pub mod scatter;

pub use scatter::{ScatterAssignment, ScatterEngine, ScatterOutcome};
