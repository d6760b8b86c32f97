//! Console diagnostics using `tracing` and `tracing-subscriber`.
//!
//! Journal records are mirrored here, so a run started by hand shows the
//! same lines that end up in its journal file. `RUST_LOG` overrides the
//! level chosen on the command line.

use clap::ValueEnum;
use tracing_subscriber::{fmt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

/// Initialize the global subscriber. Later calls are no-ops.
pub fn init_logging(format: LogFormat, verbose: bool) {
    if tracing::dispatcher::has_been_set() {
        return;
    }

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Human => {
            let _ = builder.finish().try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().finish().try_init();
        }
    };
}
