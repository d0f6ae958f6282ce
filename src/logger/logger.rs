use anyhow::{Result, anyhow};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

pub struct LogConfig {
    pub filter: String,
    pub quiet_transports: bool,
}

pub struct Logger {
    reload_handle: reload::Handle<EnvFilter, Registry>,
}

impl Logger {
    /// Installs the global subscriber with a bootstrap filter.
    ///
    /// `RUST_LOG` wins over the built-in `info` default until settings are
    /// loaded and [`Logger::reload_from_config`] replaces the filter.
    pub fn new_bootstrap() -> Self {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let (filter, reload_handle) = reload::Layer::new(filter);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();

        Self { reload_handle }
    }

    pub fn reload_from_config(&self, config: &LogConfig) -> Result<()> {
        let mut filter = EnvFilter::try_new(&config.filter).map_err(|e| anyhow!(e))?;
        if config.quiet_transports {
            // transport crates log every frame at debug
            for directive in ["tungstenite=warn", "hyper=warn", "reqwest=warn"] {
                filter = filter.add_directive(directive.parse().map_err(|e| anyhow!("{e}"))?);
            }
        }
        self.reload_handle.reload(filter).map_err(|e| anyhow!(e))?;
        Ok(())
    }
}
