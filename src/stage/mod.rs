pub mod error;
pub mod paths;
pub mod stager;

pub use paths::StagePaths;
pub use stager::{StageOutcome, stage};
