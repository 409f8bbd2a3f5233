/// CLI argument parsing and command handling - Gateway
mod args;
mod commands;
mod render;

pub use args::{Cli, Commands, OutputFormat};
pub use commands::{handle_command, show_version};
