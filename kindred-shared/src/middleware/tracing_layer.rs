use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const ENV_VAR: &str = "KINDRED_ENV";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines with file and line numbers.
    Pretty,
    /// One flattened JSON object per event.
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        Self::for_environment(std::env::var(ENV_VAR).ok().as_deref())
    }

    fn for_environment(env: Option<&str>) -> Self {
        match env.map(str::trim) {
            Some(env) if env.eq_ignore_ascii_case("production") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Filter used when `RUST_LOG` is unset.
fn default_directives(service_name: &str) -> String {
    let service_target = service_name.replace('-', "_");
    format!("info,{service_target}=debug,kindred_shared=debug,tower_http=debug")
}

/// Install the global subscriber for `service_name`.
pub fn init_tracing(service_name: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(service_name)));
    let format = LogFormat::from_env();
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_file(true).with_line_number(true))
            .init(),
    }

    tracing::info!(service = service_name, ?format, "tracing initialized");
}
