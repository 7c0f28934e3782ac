//! Planning and compilation runtime.

pub mod canonical;
pub mod compiler;
pub mod pipeline;
pub mod planner;
pub mod registry;
pub mod template;
pub mod validate;
