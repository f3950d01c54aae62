use be_api::{Record, RecordError};

use crate::config::DecoderConfig;
use crate::framing::{Framing, FramingError, ScanState};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed unit ({len} bytes): {source}")]
    Malformed {
        len: usize,
        #[source]
        source: RecordError,
    },

    #[error(transparent)]
    Framing(#[from] FramingError),
}

/// Incremental record decoder.
///
/// Bytes arrive through `feed()` in arbitrary chunks; `next_record()` yields
/// every record that is complete so far. Only the undecoded remainder is
/// buffered, and a partial unit is scanned only once across feeds. Errors are per unit: the offending bytes are already dropped
/// when the error is returned, so the caller can just keep pulling.
///
/// At end of stream call `finish()` once to flush a trailing unit.
pub struct Decoder {
    framing: Box<dyn Framing>,
    buf: Vec<u8>,
    /// Start of the undecoded bytes in `buf`; compacted on the next `feed`.
    head: usize,
    scan: ScanState,
    /// Dropping input until the framing's next restart point.
    discarding: bool,
    finished: bool,
}

impl Decoder {
    pub fn new(framing: Box<dyn Framing>) -> Self {
        Self {
            framing,
            buf: Vec::with_capacity(8192),
            head: 0,
            scan: ScanState::default(),
            discarding: false,
            finished: false,
        }
    }

    pub fn from_config(config: &DecoderConfig) -> Self {
        Self::new(config.framing.build(config.max_unit_bytes))
    }

    pub fn feed(&mut self, chunk: &[u8]) {
        if self.head > 0 {
            self.buf.drain(..self.head);
            self.head = 0;
        }
        if self.discarding {
            if let Some(n) = self.framing.resync(chunk) {
                tracing::debug!(skipped = n, "resynchronised after oversized unit");
                self.discarding = false;
                self.buf.extend_from_slice(&chunk[n..]);
            }
            return;
        }
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete record, a per-unit error, or `None` when more input is needed.
    pub fn next_record(&mut self) -> Option<Result<Record, DecodeError>> {
        loop {
            if self.discarding {
                return None;
            }
            match self.framing.decode(&self.buf[self.head..], &mut self.scan) {
                Ok(Some((unit, consumed))) => {
                    self.head += consumed;
                    if unit.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    return Some(parse(&unit));
                }
                Ok(None) => return None,
                Err(e) => {
                    self.skip_bad_unit(&e);
                    return Some(Err(e.into()));
                }
            }
        }
    }

    /// Flush the trailing unit at end of stream. Yields at most once.
    pub fn finish(&mut self) -> Option<Result<Record, DecodeError>> {
        if self.finished {
            return None;
        }
        self.finished = true;
        if self.discarding {
            return None;
        }

        let rest = std::mem::take(&mut self.buf);
        let head = std::mem::take(&mut self.head);
        match self.framing.finish(&rest[head..]) {
            Ok(Some(unit)) => Some(parse(&unit)),
            Ok(None) => None,
            Err(e) => Some(Err(e.into())),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bytes currently held for an incomplete unit.
    pub fn buffered(&self) -> usize {
        self.buf.len() - self.head
    }

    fn skip_bad_unit(&mut self, err: &FramingError) {
        match err {
            FramingError::Oversized { consumed: Some(n), .. } => {
                self.head += *n;
            }
            _ => match self.framing.resync(&self.buf[self.head..]) {
                Some(n) => {
                    self.head += n;
                }
                None => {
                    self.buf.clear();
                    self.head = 0;
                    self.discarding = true;
                }
            },
        }
    }
}

fn parse(unit: &[u8]) -> Result<Record, DecodeError> {
    Record::from_slice(unit).map_err(|source| DecodeError::Malformed {
        len: unit.len(),
        source,
    })
}
