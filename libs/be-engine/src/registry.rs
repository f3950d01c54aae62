use be_api::{Record, Sink, SinkFactory};
use sink_printer::{PrinterSink, PrinterSinkFactory};

use crate::config::{SinkConfig, config_json_or_empty};
use crate::error::ConfigError;

// ═══════════════════════════════════════════════════════════════
//  SinkCatalog: kind → factory
// ═══════════════════════════════════════════════════════════════

/// Known sink kinds. The printer is always available.
pub struct SinkCatalog {
    factories: Vec<Box<dyn SinkFactory>>,
}

impl SinkCatalog {
    pub fn new() -> Self {
        Self {
            factories: vec![Box::new(PrinterSinkFactory)],
        }
    }

    /// Add a factory. A later factory for the same kind shadows the earlier one.
    pub fn with_factory(mut self, factory: Box<dyn SinkFactory>) -> Self {
        self.factories.push(factory);
        self
    }

    pub fn get(&self, kind: &str) -> Option<&dyn SinkFactory> {
        self.factories
            .iter()
            .rev()
            .find(|f| f.kind() == kind)
            .map(|f| f.as_ref())
    }

    /// Every resolvable kind once, in first-registration order.
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<&'static str> = Vec::with_capacity(self.factories.len());
        for factory in &self.factories {
            if !kinds.contains(&factory.kind()) {
                kinds.push(factory.kind());
            }
        }
        kinds
    }
}

impl Default for SinkCatalog {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════
//  SinkRegistryBuilder → SinkRegistry
// ═══════════════════════════════════════════════════════════════

/// Mutable phase of the registry: sinks are appended in dispatch order.
#[derive(Default)]
pub struct SinkRegistryBuilder {
    sinks: Vec<Box<dyn Sink>>,
}

impl SinkRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, sink: Box<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Create sinks from `[[sinks]]` entries through the catalog.
    pub fn from_configs(catalog: &SinkCatalog, configs: &[SinkConfig]) -> Result<Self, ConfigError> {
        let mut builder = Self::new();
        for cfg in configs {
            let factory = catalog
                .get(&cfg.kind)
                .ok_or_else(|| ConfigError::UnknownSink {
                    kind: cfg.kind.clone(),
                    available: catalog.kinds(),
                })?;
            let config_json = config_json_or_empty(&cfg.config)?;
            let sink = factory
                .create(cfg.display_name(), &config_json)
                .map_err(|source| ConfigError::Sink {
                    name: cfg.display_name().to_string(),
                    source,
                })?;
            tracing::info!(kind = %cfg.kind, name = %cfg.display_name(), "created sink");
            builder = builder.register(sink);
        }
        Ok(builder)
    }

    /// Initialise every sink and freeze the list.
    ///
    /// With nothing registered, a compact stdout printer is installed so a
    /// session always has observable output.
    pub fn build(mut self) -> Result<SinkRegistry, ConfigError> {
        if self.sinks.is_empty() {
            tracing::debug!("no sinks configured, using stdout printer");
            self.sinks.push(Box::new(PrinterSink::stdout(false)));
        }
        for sink in &mut self.sinks {
            let name = sink.name().to_string();
            sink.init().map_err(|source| ConfigError::Sink { name, source })?;
        }
        Ok(SinkRegistry { sinks: self.sinks })
    }
}

/// Frozen, ordered set of sinks. Shareable across sessions (`Arc`);
/// nothing can be added once built.
pub struct SinkRegistry {
    sinks: Vec<Box<dyn Sink>>,
}

/// Outcome of delivering one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

impl SinkRegistry {
    pub fn names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Run every sink on `record`, in registration order.
    ///
    /// A failing sink is reported and skipped; later sinks still run.
    pub fn dispatch(&self, record: &Record) -> DispatchReport {
        let mut report = DispatchReport::default();
        for sink in &self.sinks {
            match sink.run(record) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::debug!(sink = %sink.name(), error = %e, "sink failed, record skipped for this sink");
                }
            }
        }
        report
    }
}
