//! Building `tracing` subscribers from a [`LoggingConfig`].

use crate::config::*;

use std::{io::Error as IoError, path::Path};
use tracing::{Metadata, Subscriber};
use tracing_core::LevelFilter;
use tracing_subscriber::{filter::filter_fn, prelude::*, registry::LookupSpan, Layer};

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Whether an entry wants to see events with this metadata
fn entry_accepts(entry: &LogEntry, level: LevelFilter, metadata: &Metadata) -> bool {
    if metadata.level() > &level {
        return false;
    }
    match metadata.module_path() {
        Some(module) if !entry.modules.is_empty() => entry.modules.iter().any(|m| module.starts_with(m.as_str())),
        _ => true,
    }
}

fn build_target<S>(entry: LogEntry, dir: &Path) -> Result<BoxedLayer<S>, IoError>
where
    S: Subscriber + Send + Sync,
    for<'span> S: LookupSpan<'span>,
{
    let output = match &entry.target {
        LogTarget::File { filename } => {
            std::fs::create_dir_all(dir)?;
            tracing_subscriber::fmt::layer()
                .with_writer(tracing_appender::rolling::daily(dir, filename))
                .with_ansi(false)
                .boxed()
        }
        LogTarget::Builtin(BuiltinLogTarget::Stdout) => tracing_subscriber::fmt::layer().with_writer(std::io::stdout).boxed(),
        LogTarget::Builtin(BuiltinLogTarget::Stderr) => tracing_subscriber::fmt::layer().with_writer(std::io::stderr).boxed(),
    };

    let level = entry.level.map_or(LevelFilter::TRACE, LevelFilter::from);
    let filter = filter_fn(move |metadata| entry_accepts(&entry, level, metadata));

    Ok(output.with_filter(filter).boxed())
}

/// Build a subscriber from the logging section of a configuration file.
///
/// `default-level` and `module-levels` apply to everything before any
/// target sees it; each target then applies its own level and module list.
pub fn build_subscriber(conf: LoggingConfig) -> Result<impl Subscriber + Send + Sync, IoError> {
    let LoggingConfig {
        dir,
        default_level,
        module_levels,
        targets,
    } = conf;

    let layers = targets
        .into_iter()
        .map(|entry| build_target(entry, &dir))
        .collect::<Result<Vec<_>, _>>()?;

    let global = tracing_subscriber::filter::Targets::new()
        .with_default(default_level.map_or(LevelFilter::TRACE, LevelFilter::from))
        .with_targets(
            module_levels
                .into_iter()
                .map(|(module, level)| (module, LevelFilter::from(level))),
        );

    Ok(tracing_subscriber::registry().with(global).with(layers))
}

/// Install either the configured subscriber or, with no logging section, a
/// plain stderr logger at `info` (overridable with `RUST_LOG`).
pub fn init(conf: Option<LoggingConfig>) -> Result<(), anyhow::Error> {
    match conf {
        Some(conf) => tracing::subscriber::set_global_default(build_subscriber(conf)?)?,
        None => {
            let filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!(e))?;
        }
    }
    Ok(())
}
