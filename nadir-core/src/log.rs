pub use log::{trace, debug, info, warn, error, LevelFilter};

/// Install the process-wide logger.
///
/// `RUST_LOG` still wins over `level` for any module it names.
pub fn initialize(level: LevelFilter) -> Result<(), anyhow::Error> {
    env_logger::builder()
        .filter_level(level)
        .filter_module("nadir_rhi::recording", level.min(LevelFilter::Debug))
        .format_timestamp_millis()
        .parse_default_env()
        .try_init()?;

    Ok(())
}
