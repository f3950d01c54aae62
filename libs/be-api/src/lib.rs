pub mod error;
pub mod record;
pub mod sink;

pub use error::{ErrorKind, SinkError};
pub use record::{JobOrigin, Record, RecordError};
pub use sink::{Sink, SinkFactory};
