pub mod create_job;
pub mod firehose;
pub mod stream;

use std::path::Path;
use std::sync::Arc;

use be_engine::{
    ClientConfig, JobFilter, SinkCatalog, SinkConfig, SinkRegistry, SinkRegistryBuilder, StreamSession, Transport,
};
use sink_toml::TomlSinkFactory;
use tokio_util::sync::CancellationToken;

use crate::error::CliError;

/// Per-invocation state shared by the subcommands.
pub struct Context {
    pub config: ClientConfig,
    pub verbose: bool,
    pub cancel: CancellationToken,
}

impl Context {
    pub fn load(path: Option<&Path>, verbose: bool, cancel: CancellationToken) -> Result<Self, CliError> {
        let config = ClientConfig::load_or_default(path)?;
        config.validate()?;
        Ok(Self { config, verbose, cancel })
    }

    pub fn token(&self, explicit: Option<&str>) -> Result<String, CliError> {
        Ok(self.config.resolve_token(explicit)?)
    }

    /// `--sink` kinds when given, otherwise the configured `[[sinks]]`.
    pub fn registry(&self, overrides: &[String]) -> Result<Arc<SinkRegistry>, CliError> {
        let sinks: Vec<SinkConfig> = if overrides.is_empty() {
            self.config.sinks.clone()
        } else {
            overrides.iter().map(|kind| SinkConfig::of_kind(kind.as_str())).collect()
        };
        let registry = SinkRegistryBuilder::from_configs(&catalog(), &sinks)?.build()?;
        tracing::debug!(sinks = ?registry.names(), "sink registry ready");
        Ok(Arc::new(registry))
    }

    /// Open `url` and dispatch until the stream ends.
    pub async fn stream(
        &self,
        url: &str,
        token: &str,
        filter: JobFilter,
        registry: Arc<SinkRegistry>,
    ) -> Result<(), CliError> {
        let transport = Transport::new(self.config.transport(url))?;
        let mut session = StreamSession::new(transport, registry)
            .with_filter(filter)
            .with_decoder(self.config.decoder.clone())
            .verbose(self.verbose)
            .with_cancellation(self.cancel.clone());
        session.run(token).await?;
        Ok(())
    }
}

fn catalog() -> SinkCatalog {
    SinkCatalog::new().with_factory(Box::new(TomlSinkFactory))
}
