//! Docflow command-line client: configuration, rendering and subcommands.
mod cli;
mod commands;
mod config;
mod interrupt;
mod logging;
mod render;

pub use cli::{
    AnalyzeCommand, Cli, Command, RefineCommand, ScanCommand, SpecsCommand, StatsCommand,
};
pub use commands::run;
pub use config::{
    load as load_config, CliConfig, ConfigError, LogConfig, LogLevel, LogTarget, ServerConfig,
    DEFAULT_CONFIG_FILE,
};
pub use interrupt::Interrupt;
pub use logging::{destination as log_destination, init_logging};
pub use render::{format_size, run_lines, step_line, summary_text, timestamped, tree_lines};
