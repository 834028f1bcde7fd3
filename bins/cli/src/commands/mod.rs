//! CLI command handlers.

pub mod config;
pub mod info;
pub mod run;

pub use config::{run_config_check, run_config_show};
pub use info::run_info;
pub use run::{RunCommandInput, run_exporter};
