//! Subcommand handlers.

pub mod config_cmd;
pub mod plan;
pub mod simulate;
