pub mod cli;
pub mod load_config;
pub mod report;

pub use cli::{exit_code, run, Cli, Commands, UserCancelled};
