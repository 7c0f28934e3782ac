//! Worldspec pipeline: deterministic prompt-to-world planning.
//!
//! Turns a free-text prompt into a schema-valid world specification by
//! ranking asset packs and style kits against prompt tokens and placing a
//! bounded number of props into fixed floor slots with a seeded generator,
//! then compiles that specification into a content-addressed phase-0
//! geometry artifact.

pub mod core;
pub mod schema;
