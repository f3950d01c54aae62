use std::sync::Arc;

use be_api::Record;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::config::DecoderConfig;
use crate::decoder::{DecodeError, Decoder};
use crate::error::{Failure, SessionError};
use crate::filter::JobFilter;
use crate::registry::SinkRegistry;
use crate::transport::Transport;

/// Lifecycle of one streaming invocation.
///
/// `Created → Connecting → Streaming → Terminated`; a failed connect goes
/// straight to `Terminated`. There is no way back out of `Terminated`:
/// `run` and `pump` refuse to start again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Connecting,
    Streaming,
    /// `None` = clean end of stream.
    Terminated(Option<Failure>),
}

/// Counters for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub bytes_read: u64,
    pub records_decoded: u64,
    pub dispatched: u64,
    pub filtered_out: u64,
    pub decode_errors: u64,
    pub sink_failures: u64,
}

/// Orchestrates one stream: connect, decode, filter, dispatch.
///
/// Everything runs on the caller's task. Records are dispatched one at a
/// time, in wire order, and dropped before the next read.
pub struct StreamSession {
    transport: Transport,
    registry: Arc<SinkRegistry>,
    filter: JobFilter,
    decoder: DecoderConfig,
    verbose: bool,
    cancel: CancellationToken,
    state: SessionState,
    report: SessionReport,
}

impl StreamSession {
    pub fn new(transport: Transport, registry: Arc<SinkRegistry>) -> Self {
        Self {
            transport,
            registry,
            filter: JobFilter::none(),
            decoder: DecoderConfig::default(),
            verbose: false,
            cancel: CancellationToken::new(),
            state: SessionState::Created,
            report: SessionReport::default(),
        }
    }

    pub fn with_filter(mut self, filter: JobFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_decoder(mut self, decoder: DecoderConfig) -> Self {
        self.decoder = decoder;
        self
    }

    /// Echo request and response metadata on the wire diagnostic target.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Cancelling `token` ends the session with `SessionError::Cancelled`.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn report(&self) -> &SessionReport {
        &self.report
    }

    /// Run the session to termination.
    ///
    /// A session runs once; any later call fails with `AlreadyStarted`
    /// and leaves the state untouched.
    pub async fn run(&mut self, token: &str) -> Result<SessionReport, SessionError> {
        self.ensure_fresh(SessionState::Created)?;
        if token.trim().is_empty() {
            return self.terminate(Err(SessionError::MissingToken));
        }

        self.transition(SessionState::Connecting);
        let response = match self.connect(token).await {
            Ok(response) => response,
            Err(e) => return self.terminate(Err(e)),
        };
        tracing::info!(url = %response.url(), job_id = ?self.filter.job_id(), "connected");

        self.pump(response.bytes_stream()).await
    }

    async fn connect(&self, token: &str) -> Result<reqwest::Response, SessionError> {
        let query: Vec<(&str, &str)> = match self.filter.job_id() {
            Some(id) => vec![("job_id", id)],
            None => Vec::new(),
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SessionError::Cancelled),
            response = self.transport.open(token, &query, self.verbose) => response,
        }
    }

    /// Drive an open byte stream until it closes, then terminate.
    ///
    /// Accepted only from `Created` or `Connecting`.
    pub async fn pump<S, E>(&mut self, body: S) -> Result<SessionReport, SessionError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.ensure_fresh(SessionState::Connecting)?;
        self.transition(SessionState::Streaming);
        let result = self.stream(body).await;
        self.terminate(result)
    }

    async fn stream<S, E>(&mut self, body: S) -> Result<SessionReport, SessionError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let mut body = std::pin::pin!(body);
        let mut decoder = Decoder::from_config(&self.decoder);
        let read_timeout = self.transport.config().read_timeout;
        let mut consecutive_errors = 0u32;

        loop {
            while let Some(unit) = decoder.next_record() {
                self.handle(unit, &mut consecutive_errors)?;
            }

            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(SessionError::Cancelled),
                next = tokio::time::timeout(read_timeout, body.next()) => next,
            };
            match next {
                Err(_) => return Err(SessionError::ReadTimeout(read_timeout)),
                Ok(Some(Ok(chunk))) => {
                    self.report.bytes_read += chunk.len() as u64;
                    decoder.feed(&chunk);
                }
                Ok(Some(Err(e))) => return Err(SessionError::Read(e.into())),
                Ok(None) => break,
            }
        }

        // A bad trailing unit is dropped, never terminal.
        match decoder.finish() {
            Some(Ok(record)) => self.handle(Ok(record), &mut consecutive_errors)?,
            Some(Err(e)) => {
                self.report.decode_errors += 1;
                tracing::warn!(error = %e, "dropping trailing unit at end of stream");
            }
            None => {}
        }
        tracing::debug!(bytes = self.report.bytes_read, "stream closed by peer");
        Ok(self.report.clone())
    }

    /// `Created`, or anything up to `latest` in the lifecycle.
    fn ensure_fresh(&self, latest: SessionState) -> Result<(), SessionError> {
        match self.state {
            SessionState::Created => Ok(()),
            state if state == latest => Ok(()),
            state => Err(SessionError::AlreadyStarted(state)),
        }
    }

    fn terminate(&mut self, result: Result<SessionReport, SessionError>) -> Result<SessionReport, SessionError> {
        self.transition(SessionState::Terminated(
            result.as_ref().err().map(SessionError::failure),
        ));
        match &result {
            Ok(report) => tracing::info!(
                dispatched = report.dispatched,
                filtered_out = report.filtered_out,
                decode_errors = report.decode_errors,
                sink_failures = report.sink_failures,
                "stream ended"
            ),
            Err(e) => tracing::debug!(error = %e, "session failed"),
        }
        result
    }

    fn handle(
        &mut self,
        unit: Result<Record, DecodeError>,
        consecutive_errors: &mut u32,
    ) -> Result<(), SessionError> {
        match unit {
            Ok(record) => {
                *consecutive_errors = 0;
                self.report.records_decoded += 1;
                if !self.filter.matches(&record) {
                    self.report.filtered_out += 1;
                    return Ok(());
                }
                let dispatch = self.registry.dispatch(&record);
                self.report.dispatched += 1;
                self.report.sink_failures += dispatch.failed as u64;
                Ok(())
            }
            Err(e) => {
                *consecutive_errors += 1;
                self.report.decode_errors += 1;
                tracing::warn!(error = %e, "skipping malformed unit");

                let max = self.decoder.max_consecutive_errors;
                if max > 0 && *consecutive_errors > max {
                    return Err(SessionError::Decode {
                        count: *consecutive_errors,
                        last: e.to_string(),
                    });
                }
                Ok(())
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }
}
