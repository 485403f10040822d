use clap::{Parser, ValueEnum};
use log::LevelFilter;

/// Log level options for command-line argument.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Off => LevelFilter::Off,
        }
    }
}

/// Common command-line arguments for Nadir applications.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct EngineArgs {
    /// Set the log verbosity level
    #[arg(short = 'l', long = "log-level", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Number of frames to record before exiting
    #[arg(short = 'f', long = "frames", default_value_t = 3)]
    pub frames: u32,

    /// Dump every recorded command at debug level
    #[arg(long = "dump-commands")]
    pub dump_commands: bool,

    /// Additional positional arguments passed to the application
    #[arg(trailing_var_arg = true)]
    pub args: Vec<String>,
}

impl EngineArgs {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_flags() {
        let args = EngineArgs::parse_from(["sandbox"]);
        assert!(matches!(args.log_level, LogLevel::Info));
        assert_eq!(args.frames, 3);
        assert!(!args.dump_commands);
    }

    #[test]
    fn parses_level_and_frames() {
        let args = EngineArgs::parse_from(["sandbox", "-l", "trace", "--frames", "8"]);
        assert_eq!(LevelFilter::from(args.log_level), LevelFilter::Trace);
        assert_eq!(args.frames, 8);
    }
}
