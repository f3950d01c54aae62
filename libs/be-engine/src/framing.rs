use serde::Deserialize;

/// Framing: finds unit boundaries in the raw byte feed.
///
/// Implementations hold no state of their own: the caller owns the buffer,
/// drains `consumed` bytes after every extracted unit, and keeps a
/// `ScanState` so an incomplete unit is never rescanned from its start.
/// An empty unit means "whitespace only" and carries nothing to decode.
pub trait Framing: Send + Sync {
    /// Extract one unit from the front of `buf`.
    /// Returns `(unit, bytes_consumed)` or `None` if the unit is incomplete.
    ///
    /// `scan` must be the state left by the previous call on the same
    /// (grown) buffer; it is reset whenever a unit or an error is returned.
    fn decode(&self, buf: &[u8], scan: &mut ScanState) -> Result<Option<(Vec<u8>, usize)>, FramingError>;

    /// Leftover bytes at end of stream: the final unit, if any.
    fn finish(&self, buf: &[u8]) -> Result<Option<Vec<u8>>, FramingError>;

    /// Offset just past the next safe restart point, used after an
    /// oversized unit has been discarded.
    fn resync(&self, buf: &[u8]) -> Option<usize> {
        buf.iter().position(|&b| b == b'\n').map(|p| p + 1)
    }
}

/// Progress through the incomplete unit at the front of the buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanState {
    /// Bytes of the buffer already examined.
    offset: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl ScanState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    /// `consumed` is set when the unit end is already in the buffer;
    /// otherwise the caller must discard until `resync`.
    #[error("unit too long: {len} bytes (max {max})")]
    Oversized {
        len: usize,
        max: usize,
        consumed: Option<usize>,
    },

    #[error("stream ended inside a unit ({len} bytes pending)")]
    Truncated { len: usize },
}

/// Wire layout of the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingMode {
    /// One JSON object per line.
    #[default]
    Lines,
    /// Self-delimiting concatenated objects, split by brace balance.
    Objects,
}

impl FramingMode {
    pub fn build(self, max_length: usize) -> Box<dyn Framing> {
        match self {
            FramingMode::Lines => Box::new(LinesFraming { max_length }),
            FramingMode::Objects => Box::new(ObjectFraming { max_length }),
        }
    }
}

fn too_long(len: usize, max: usize) -> bool {
    max > 0 && len > max
}

// ═══════════════════════════════════════════════════════════════
//  LinesFraming
// ═══════════════════════════════════════════════════════════════

/// Newline-delimited units. `\r\n` is accepted.
pub struct LinesFraming {
    /// Max line length in bytes (0 = unlimited).
    pub max_length: usize,
}

fn trim_cr(line: &[u8]) -> &[u8] {
    match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    }
}

impl Framing for LinesFraming {
    fn decode(&self, buf: &[u8], scan: &mut ScanState) -> Result<Option<(Vec<u8>, usize)>, FramingError> {
        let from = scan.offset.min(buf.len());
        let pos = match buf[from..].iter().position(|&b| b == b'\n') {
            Some(p) => {
                scan.reset();
                from + p
            }
            None => {
                scan.offset = buf.len();
                if too_long(buf.len(), self.max_length) {
                    scan.reset();
                    return Err(FramingError::Oversized {
                        len: buf.len(),
                        max: self.max_length,
                        consumed: None,
                    });
                }
                return Ok(None);
            }
        };

        let consumed = pos + 1;
        let line = trim_cr(&buf[..pos]);

        if too_long(line.len(), self.max_length) {
            return Err(FramingError::Oversized {
                len: line.len(),
                max: self.max_length,
                consumed: Some(consumed),
            });
        }

        Ok(Some((line.to_vec(), consumed)))
    }

    fn finish(&self, buf: &[u8]) -> Result<Option<Vec<u8>>, FramingError> {
        let line = trim_cr(buf);
        if line.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        if too_long(line.len(), self.max_length) {
            return Err(FramingError::Oversized {
                len: line.len(),
                max: self.max_length,
                consumed: Some(buf.len()),
            });
        }
        Ok(Some(line.to_vec()))
    }
}

// ═══════════════════════════════════════════════════════════════
//  ObjectFraming
// ═══════════════════════════════════════════════════════════════

/// Concatenated JSON objects, delimited by brace balance.
///
/// Braces inside string literals (including escaped quotes) are ignored.
/// Bytes before an opening brace are emitted as their own unit, up to the
/// next `{` or newline, so that the decoder reports and skips them.
pub struct ObjectFraming {
    /// Max object length in bytes (0 = unlimited).
    pub max_length: usize,
}

impl ObjectFraming {
    /// Continue scanning the object that opens at `buf[0]`; index of its
    /// closing brace once seen.
    fn closing_brace(buf: &[u8], scan: &mut ScanState) -> Option<usize> {
        for (i, &b) in buf.iter().enumerate().skip(scan.offset) {
            if scan.in_string {
                match b {
                    _ if scan.escaped => scan.escaped = false,
                    b'\\' => scan.escaped = true,
                    b'"' => scan.in_string = false,
                    _ => {}
                }
                continue;
            }
            match b {
                b'"' => scan.in_string = true,
                b'{' | b'[' => scan.depth += 1,
                b'}' | b']' => {
                    scan.depth = scan.depth.saturating_sub(1);
                    if scan.depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        scan.offset = buf.len();
        None
    }

    fn oversized(&self, len: usize, scan: &mut ScanState) -> FramingError {
        scan.reset();
        FramingError::Oversized {
            len,
            max: self.max_length,
            consumed: None,
        }
    }
}

impl Framing for ObjectFraming {
    fn decode(&self, buf: &[u8], scan: &mut ScanState) -> Result<Option<(Vec<u8>, usize)>, FramingError> {
        let Some(&first) = buf.first() else {
            return Ok(None);
        };

        if first.is_ascii_whitespace() {
            // Leading whitespace: swallow it as an empty unit.
            let end = buf.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(buf.len());
            scan.reset();
            return Ok(Some((Vec::new(), end)));
        }

        if first != b'{' {
            let from = scan.offset.max(1).min(buf.len());
            return match buf[from..].iter().position(|&b| b == b'{' || b == b'\n') {
                Some(p) => {
                    scan.reset();
                    let end = from + p;
                    Ok(Some((buf[..end].to_vec(), end)))
                }
                None if too_long(buf.len(), self.max_length) => Err(self.oversized(buf.len(), scan)),
                None => {
                    scan.offset = buf.len();
                    Ok(None)
                }
            };
        }

        match Self::closing_brace(buf, scan) {
            Some(end) => {
                scan.reset();
                let consumed = end + 1;
                if too_long(consumed, self.max_length) {
                    return Err(FramingError::Oversized {
                        len: consumed,
                        max: self.max_length,
                        consumed: Some(consumed),
                    });
                }
                Ok(Some((buf[..consumed].to_vec(), consumed)))
            }
            None if too_long(buf.len(), self.max_length) => Err(self.oversized(buf.len(), scan)),
            None => Ok(None),
        }
    }

    fn finish(&self, buf: &[u8]) -> Result<Option<Vec<u8>>, FramingError> {
        let pending = buf.iter().filter(|b| !b.is_ascii_whitespace()).count();
        if pending == 0 {
            Ok(None)
        } else {
            Err(FramingError::Truncated { len: pending })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn once(f: &dyn Framing, buf: &[u8]) -> Result<Option<(Vec<u8>, usize)>, FramingError> {
        f.decode(buf, &mut ScanState::default())
    }

    fn unit(r: Result<Option<(Vec<u8>, usize)>, FramingError>) -> (String, usize) {
        let (data, consumed) = r.unwrap().unwrap();
        (String::from_utf8(data).unwrap(), consumed)
    }

    #[test]
    fn lines_waits_for_newline() {
        let f = LinesFraming { max_length: 0 };
        assert_eq!(once(&f, br#"{"x":1"#).unwrap(), None);
        assert_eq!(unit(once(&f, b"{\"x\":1}\n{\"x\"")), ("{\"x\":1}".into(), 8));
    }

    #[test]
    fn lines_strips_crlf() {
        let f = LinesFraming { max_length: 0 };
        assert_eq!(unit(once(&f, b"{\"x\":1}\r\n")), ("{\"x\":1}".into(), 9));
    }

    #[test]
    fn lines_blank_line_is_empty_unit() {
        let f = LinesFraming { max_length: 0 };
        assert_eq!(unit(once(&f, b"\n{}")), (String::new(), 1));
    }

    #[test]
    fn lines_oversized_without_newline_needs_resync() {
        let f = LinesFraming { max_length: 4 };
        assert_eq!(
            once(&f, b"123456"),
            Err(FramingError::Oversized { len: 6, max: 4, consumed: None })
        );
        assert_eq!(
            once(&f, b"123456\nab"),
            Err(FramingError::Oversized { len: 6, max: 4, consumed: Some(7) })
        );
        assert_eq!(f.resync(b"789\n{}"), Some(4));
        assert_eq!(f.resync(b"789"), None);
    }

    #[test]
    fn lines_finish_returns_trailing_line() {
        let f = LinesFraming { max_length: 0 };
        assert_eq!(f.finish(b"{\"x\":1}").unwrap(), Some(b"{\"x\":1}".to_vec()));
        assert_eq!(f.finish(b"  \r").unwrap(), None);
        assert_eq!(f.finish(b"").unwrap(), None);
    }

    #[test]
    fn objects_split_by_brace_balance() {
        let f = ObjectFraming { max_length: 0 };
        let buf = br#"  {"a":{"b":[1,{"c":2}]}}{"x":2}"#;
        assert_eq!(unit(once(&f, buf)), (String::new(), 2));
        let (first, consumed) = unit(once(&f, &buf[2..]));
        assert_eq!(first, r#"{"a":{"b":[1,{"c":2}]}}"#);
        assert_eq!(unit(once(&f, &buf[2 + consumed..])).0, r#"{"x":2}"#);
    }

    #[test]
    fn objects_ignore_braces_in_strings() {
        let f = ObjectFraming { max_length: 0 };
        let buf = br#"{"s":"}{ \"}\" \\"}{"#;
        assert_eq!(unit(once(&f, buf)).0, r#"{"s":"}{ \"}\" \\"}"#);
    }

    #[test]
    fn objects_incomplete_waits() {
        let f = ObjectFraming { max_length: 0 };
        assert_eq!(once(&f, br#"{"a":{"b":1}"#).unwrap(), None);
        assert_eq!(once(&f, b"").unwrap(), None);
    }

    #[test]
    fn objects_garbage_before_brace_is_its_own_unit() {
        let f = ObjectFraming { max_length: 0 };
        assert_eq!(unit(once(&f, br#"oops{"x":1}"#)), ("oops".into(), 4));
        assert_eq!(unit(once(&f, b"oops\n{")), ("oops".into(), 4));
    }

    #[test]
    fn objects_whitespace_is_swallowed() {
        let f = ObjectFraming { max_length: 0 };
        assert_eq!(unit(once(&f, b" \n\t")), (String::new(), 3));
    }

    #[test]
    fn objects_finish_reports_truncation() {
        let f = ObjectFraming { max_length: 0 };
        assert_eq!(f.finish(b" \n").unwrap(), None);
        assert_eq!(f.finish(br#"{"x":"#), Err(FramingError::Truncated { len: 5 }));
    }

    #[test]
    fn lines_resume_scan_where_it_stopped() {
        let f = LinesFraming { max_length: 0 };
        let mut scan = ScanState::default();
        let mut buf = b"{\"a\":".to_vec();

        assert_eq!(f.decode(&buf, &mut scan).unwrap(), None);
        assert_eq!(scan.offset(), 5);
        buf.extend_from_slice(b"1}");
        assert_eq!(f.decode(&buf, &mut scan).unwrap(), None);
        assert_eq!(scan.offset(), 7);
        buf.extend_from_slice(b"\n");

        assert_eq!(unit(f.decode(&buf, &mut scan)), ("{\"a\":1}".into(), 8));
        assert_eq!(scan, ScanState::default());
    }

    #[test]
    fn objects_keep_string_and_depth_across_calls() {
        let f = ObjectFraming { max_length: 0 };
        let mut scan = ScanState::default();
        let mut buf = br#"{"s":"}{\"#.to_vec();

        assert_eq!(f.decode(&buf, &mut scan).unwrap(), None);
        assert_eq!(scan.offset(), buf.len());
        buf.extend_from_slice(br#"","n":{"m":[1]"#);
        assert_eq!(f.decode(&buf, &mut scan).unwrap(), None);
        buf.extend_from_slice(b"}}{");

        let (object, consumed) = unit(f.decode(&buf, &mut scan));
        assert_eq!(object, r#"{"s":"}{\"","n":{"m":[1]}}"#);
        assert_eq!(consumed, buf.len() - 1);
        assert_eq!(scan, ScanState::default());
    }

    #[test]
    fn objects_garbage_scan_resumes() {
        let f = ObjectFraming { max_length: 0 };
        let mut scan = ScanState::default();
        let mut buf = b"junk".to_vec();

        assert_eq!(f.decode(&buf, &mut scan).unwrap(), None);
        buf.extend_from_slice(b"more{");
        assert_eq!(unit(f.decode(&buf, &mut scan)), ("junkmore".into(), 8));
    }
}
