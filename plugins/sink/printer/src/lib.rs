use std::io::Write;
use std::sync::Mutex;

use be_api::{Record, Sink, SinkError, SinkFactory};

/// Console printer: one JSON rendering per record.
///
/// Compact mode writes one line per record, so the output is itself a
/// line-delimited feed. Pretty mode indents and separates records with a
/// blank line.
pub struct PrinterSink {
    name: String,
    pretty: bool,
    out: Mutex<Box<dyn Write + Send>>,
}

impl PrinterSink {
    pub fn new(name: impl Into<String>, pretty: bool, out: Box<dyn Write + Send>) -> Self {
        Self {
            name: name.into(),
            pretty,
            out: Mutex::new(out),
        }
    }

    pub fn stdout(pretty: bool) -> Self {
        Self::new("printer", pretty, Box::new(std::io::stdout()))
    }
}

impl Sink for PrinterSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, record: &Record) -> Result<(), SinkError> {
        let rendered = if self.pretty {
            serde_json::to_vec_pretty(record)?
        } else {
            serde_json::to_vec(record)?
        };

        let mut out = self
            .out
            .lock()
            .map_err(|_| SinkError::io("output lock poisoned"))?;
        out.write_all(&rendered)?;
        out.write_all(if self.pretty { b"\n\n" } else { b"\n" })?;
        out.flush()?;
        Ok(())
    }
}

// ---- Factory ----

#[derive(Debug, Default, serde::Deserialize)]
struct PrinterConfig {
    #[serde(default)]
    pretty: bool,
}

pub struct PrinterSinkFactory;

impl SinkFactory for PrinterSinkFactory {
    fn kind(&self) -> &'static str {
        "printer"
    }

    fn create(&self, name: &str, config_json: &str) -> Result<Box<dyn Sink>, SinkError> {
        let config: PrinterConfig = serde_json::from_str(config_json)
            .map_err(|e| SinkError::config(format!("printer config: {e}")))?;
        Ok(Box::new(PrinterSink::new(
            name,
            config.pretty,
            Box::new(std::io::stdout()),
        )))
    }
}
