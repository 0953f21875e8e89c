//! Tracing subscriber setup driven by the `logging` config section.

use rsl_fetch_core::config::LoggingConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Level used when `RUST_LOG` is not set.
fn base_level(config: Option<&LoggingConfig>, verbose: bool) -> String {
    if verbose {
        return "debug".into();
    }
    config
        .and_then(|c| c.level.clone())
        .unwrap_or_else(|| "info".into())
}

fn build_filter(config: Option<&LoggingConfig>, verbose: bool) -> anyhow::Result<EnvFilter> {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(base_level(config, verbose)));
    for directive in config.map(|c| c.filters.as_slice()).unwrap_or_default() {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

pub fn init(config: Option<&LoggingConfig>, verbose: bool) -> anyhow::Result<()> {
    let filter = build_filter(config, verbose)?;

    let writer = match config.map(|c| c.output.as_str()) {
        Some("stdout") => BoxMakeWriter::new(std::io::stdout),
        _ => BoxMakeWriter::new(std::io::stderr),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);

    if config.is_some_and(|c| c.format == "json") {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
