use docflow_logging::LogDestination;

use crate::config::{LogConfig, LogTarget};

pub fn destination(config: &LogConfig) -> LogDestination {
    match config.destination {
        LogTarget::Terminal => LogDestination::Terminal,
        LogTarget::File => LogDestination::File(config.file.clone()),
        LogTarget::Both => LogDestination::Both(config.file.clone()),
    }
}

/// Installs the global logger described by `config`.
pub fn init_logging(config: &LogConfig) {
    docflow_logging::initialize(destination(config), config.level.into());
}
