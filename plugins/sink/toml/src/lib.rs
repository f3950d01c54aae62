use std::io::Write;
use std::sync::Mutex;

use be_api::{Record, Sink, SinkError, SinkFactory};

/// Structural re-encoder: every record becomes one TOML document.
///
/// Documents are separated by a blank line. JSON `null` has no TOML
/// representation, so records containing one fail with `ErrorKind::Encode`
/// and nothing is written for them.
pub struct TomlSink {
    name: String,
    pretty: bool,
    out: Mutex<Box<dyn Write + Send>>,
}

impl TomlSink {
    pub fn new(name: impl Into<String>, pretty: bool, out: Box<dyn Write + Send>) -> Self {
        Self {
            name: name.into(),
            pretty,
            out: Mutex::new(out),
        }
    }

    fn encode(&self, record: &Record) -> Result<String, SinkError> {
        let encoded = if self.pretty {
            toml::to_string_pretty(record)
        } else {
            toml::to_string(record)
        };
        encoded.map_err(|e| SinkError::encode(e.to_string()).with_context("toml encode"))
    }
}

impl Sink for TomlSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, record: &Record) -> Result<(), SinkError> {
        // Encode before locking so a bad record never leaves a partial document.
        let doc = self.encode(record)?;

        let mut out = self
            .out
            .lock()
            .map_err(|_| SinkError::io("output lock poisoned"))?;
        out.write_all(doc.as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}

// ---- Factory ----

#[derive(Debug, Default, serde::Deserialize)]
struct TomlConfig {
    #[serde(default)]
    pretty: bool,
}

pub struct TomlSinkFactory;

impl SinkFactory for TomlSinkFactory {
    fn kind(&self) -> &'static str {
        "toml"
    }

    fn create(&self, name: &str, config_json: &str) -> Result<Box<dyn Sink>, SinkError> {
        let config: TomlConfig = serde_json::from_str(config_json)
            .map_err(|e| SinkError::config(format!("toml config: {e}")))?;
        Ok(Box::new(TomlSink::new(
            name,
            config.pretty,
            Box::new(std::io::stdout()),
        )))
    }
}
