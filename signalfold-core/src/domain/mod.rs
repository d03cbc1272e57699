//! Domain types shared by the engine and the runner.

pub mod direction;
pub mod position;
pub mod probability;

pub use direction::Direction;
pub use position::Position;
pub use probability::{ClassProbs, ProbabilityError, ProbabilityOutput};
