//! dialect_server: configuration and subcommands behind the `dialect-sync`
//! binary.

pub mod commands;
pub mod settings;
