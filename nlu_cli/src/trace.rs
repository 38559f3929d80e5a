use std::fmt;
use tracing::Subscriber;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Create the initial subscriber, alongside the custom formatting for standard i/o.
///
/// `RUST_LOG` takes precedence over `default_directives`.
pub fn create_subscriber(default_directives: &str) -> impl Subscriber + Send + Sync + use<> {
    let env_filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
    let nlu_filter = tracing_subscriber::filter::filter_fn(|f| f.target().starts_with("nlu"));

    let nlu_format = tracing_subscriber::fmt::format()
        .with_level(true)
        .with_source_location(true)
        .with_timer(Uptime::default());
    let normal_format = nlu_format.clone().with_source_location(false);

    // We only want file locations in our own logs, dependencies get the plain format.
    let nlu_logger = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .event_format(nlu_format)
        .with_filter(nlu_filter)
        .with_filter(env_filter());
    let normal_logger = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .event_format(normal_format)
        .with_filter(tracing_subscriber::filter::filter_fn(|m| !m.target().starts_with("nlu")))
        .with_filter(env_filter());

    tracing_subscriber::registry().with(nlu_logger).with(normal_logger)
}

#[derive(Clone)]
struct Uptime(std::time::Instant);

impl Default for Uptime {
    fn default() -> Self {
        Uptime(std::time::Instant::now())
    }
}

impl FormatTime for Uptime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let e = self.0.elapsed();
        let sub_seconds = (e.as_millis() % 1000) / 100;
        write!(w, "{}.{}s", e.as_secs(), sub_seconds)
    }
}
