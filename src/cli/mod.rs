pub mod args;
pub mod commands;

pub use args::{Cli, Commands, ProvisionOpts};
pub use commands::handle_command;
