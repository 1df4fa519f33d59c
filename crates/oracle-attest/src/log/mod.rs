// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! Logging related stuff

use anyhow::Context;
use clap::builder::{PossibleValue, PossibleValuesParser, TypedValueParser};
use tracing::level_filters::LevelFilter;
use tracing_log::LogTracer;
use tracing_subscriber::Registry;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// clap value parser for [`LevelFilter`], accepting the names in `LOG_LEVELS`
#[derive(Clone)]
pub struct LogLevelParser;

impl TypedValueParser for LogLevelParser {
    type Value = LevelFilter;

    fn parse_ref(
        &self,
        cmd: &clap::Command,
        arg: Option<&clap::Arg>,
        value: &std::ffi::OsStr,
    ) -> std::result::Result<Self::Value, clap::Error> {
        let level =
            PossibleValuesParser::new(LOG_LEVELS).parse_ref(cmd, arg, &value.to_ascii_lowercase())?;
        level
            .parse::<LevelFilter>()
            .map_err(|_| clap::Error::new(clap::error::ErrorKind::InvalidValue).with_cmd(cmd))
    }

    fn possible_values(&self) -> Option<Box<dyn Iterator<Item = PossibleValue> + '_>> {
        Some(Box::new(LOG_LEVELS.into_iter().map(PossibleValue::new)))
    }
}

/// Build the default filter directive for `crate_name` and this library.
fn filter_directive(crate_name: &str, log_level: &LevelFilter) -> String {
    match *log_level {
        LevelFilter::OFF => "off".into(),
        _ => {
            let level = log_level.to_string().to_ascii_lowercase();
            format!("warn,{crate_name}={level},oracle_attest={level}")
        }
    }
}

/// Setup standard logging and loglevel for the calling crate and the `oracle_attest` crate.
///
/// `RUST_LOG` takes precedence over `log_level`, if set.
pub fn setup_logging(crate_name: &str, log_level: &LevelFilter) -> anyhow::Result<()> {
    LogTracer::init().context("Failed to set logger")?;
    let filter = EnvFilter::builder()
        .try_from_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(crate_name, log_level)));
    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr));
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
