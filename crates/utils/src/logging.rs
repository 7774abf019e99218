//! Tracing subscriber and optional Sentry bootstrap shared by binaries.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,server=debug,services=debug,db=info";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter. When `with_sentry` is set, events
/// at `error` level are forwarded to Sentry as well.
pub fn init(with_sentry: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(with_sentry.then(|| sentry_tracing::layer()))
        .init();
}

/// Start the Sentry client when a DSN is configured.
///
/// The returned guard must be held for the life of the process; dropping it
/// flushes pending events.
pub fn init_sentry(dsn: Option<&str>) -> Option<sentry::ClientInitGuard> {
    let dsn = dsn.filter(|d| !d.trim().is_empty())?;
    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));
    Some(guard)
}
