//! clab-sessions CLI library
//!
//! Command orchestration, session launch adapters, and the quick pipeline
//! on top of cls-core's model and resolution engine.

pub mod commands;
pub mod error;
pub mod launch;
pub mod output;
pub mod quick;
