pub mod config;
pub mod decoder;
pub mod error;
pub mod filter;
pub mod framing;
pub mod jobs;
pub mod registry;
pub mod session;
pub mod transport;

pub use config::{ClientConfig, DecoderConfig, SinkConfig};
pub use decoder::{DecodeError, Decoder};
pub use error::{ConfigError, Failure, JobError, SessionError};
pub use filter::JobFilter;
pub use framing::{Framing, FramingError, FramingMode, LinesFraming, ObjectFraming, ScanState};
pub use jobs::{CreatedJob, JobClient, JobOptions, JobRequest, PortDef, parse_modules, parse_targets};
pub use registry::{DispatchReport, SinkCatalog, SinkRegistry, SinkRegistryBuilder};
pub use session::{SessionReport, SessionState, StreamSession};
pub use transport::{Transport, TransportConfig};
