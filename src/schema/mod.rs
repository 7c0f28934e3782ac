//! Strongly typed records exchanged between the registries, the planner
//! and the phase-0 compiler.

pub mod artifact;
pub mod manifest;
pub mod worldspec;
