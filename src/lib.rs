pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod prescriptions;
pub mod reminders;
pub mod schedule;
pub mod worker;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the built-in default filter. With `pretty` set the
/// multi-line human formatter is used, otherwise the compact one-line format.
pub fn init_tracing(pretty: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if pretty {
        builder.pretty().try_init()
    } else {
        builder.compact().try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
