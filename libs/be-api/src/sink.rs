use crate::error::SinkError;
use crate::record::Record;

/// Sink: a pluggable consumer of records.
///
/// Lifecycle:
/// - `init()`: once, at registration, before streaming begins. Acquire
///   output handles here.
/// - `run()`: once per record that survives filtering, in arrival order.
///   The session never calls `run` concurrently on the same sink, but the
///   registry may be shared between sessions, so state lives behind `&self`.
///
/// A failing `run` affects only that (sink, record) pair.
pub trait Sink: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    fn init(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn run(&self, record: &Record) -> Result<(), SinkError>;
}

/// Sink factory: creates a sink of one `kind` from its JSON config.
///
/// `config_json` is `"{}"` when the config table is absent.
pub trait SinkFactory: Send + Sync {
    fn kind(&self) -> &'static str;

    fn create(&self, name: &str, config_json: &str) -> Result<Box<dyn Sink>, SinkError>;
}
