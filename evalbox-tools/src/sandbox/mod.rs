pub mod deadline;
pub mod limits;
pub mod runner;

pub use deadline::{DeadlineController, DeadlineResult};
pub use limits::ResourceLimits;
pub use runner::IsolatedRunner;
