//! Subcommand implementations

pub mod classify;
pub mod pipeline;
pub mod simulate;
pub mod sweep;
