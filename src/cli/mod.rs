//! Command-line interface

pub mod commands;

pub use commands::{cmd_config, cmd_demo, cmd_keygen, load_config, CliResult};
