//! Command handlers -- one module per subcommand

pub mod config;
pub mod evaluate;
pub mod schedule;
