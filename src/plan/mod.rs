pub mod build_plan;
pub mod component;
pub mod hooks;

pub use build_plan::BuildPlan;
