use std::io::Write as _;

use anyhow::Result;
use chrono::{Local, SecondsFormat};
use env_logger::{Builder, Env, WriteStyle};
use log::LevelFilter;

const LOG_FILTER_VARIABLE: &str = "EPOCH_CACHER_LOG";
const LOG_STYLE_VARIABLE: &str = "EPOCH_CACHER_LOG_STYLE";

const LOGGING_CRATES: &[&str] = &[
    "artifacts",
    "assignment_codec",
    "beacon_api",
    "binary_utils",
    "cache_store",
    "ingestion",
];

/// Logs `info` and above from workspace crates and the calling binary.
///
/// Directives in `EPOCH_CACHER_LOG` take precedence over the defaults.
pub fn initialize_logger(module_path: &str, always_write_style: bool) -> Result<()> {
    let mut builder = Builder::new();

    builder.filter_level(LevelFilter::Off);

    for module in LOGGING_CRATES.iter().copied().chain([module_path]) {
        builder.filter_module(module, LevelFilter::Info);
    }

    if always_write_style {
        builder.write_style(WriteStyle::Always);
    }

    builder
        .parse_env(
            Env::new()
                .filter(LOG_FILTER_VARIABLE)
                .write_style(LOG_STYLE_VARIABLE),
        )
        .format(|formatter, record| {
            let level_style = formatter.default_level_style(record.level());

            writeln!(
                formatter,
                "[{}] {level_style}{:5}{level_style:#} {}: {}",
                Local::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                record.level(),
                record.target(),
                record.args(),
            )
        })
        .try_init()
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logger_is_initialized_once() -> Result<()> {
        initialize_logger(module_path!(), false)?;

        log::info!("logger initialized");

        initialize_logger(module_path!(), false)
            .expect_err("global logger can only be set once per process");

        Ok(())
    }
}
