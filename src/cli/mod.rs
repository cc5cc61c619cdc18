//! CLI command handling module
//!
//! Handles the lineage command, the config subcommands and logging setup.

mod commands;
mod lineage;
mod logging;

pub use commands::{ConfigSubcommand, handle_config_command};
pub use lineage::{LineageReport, LineageRequest, relation_rules, run_lineage};
pub use logging::init_logging;
