//! # Streaming Request Engine
//!
//! Drives one run of the status protocol over a [`StatusTransport`]:
//!
//! ```text
//! Idle -> Connected -> AwaitingResponse -> Delivered -> (poll) AwaitingResponse
//!                             |                  \-> Closed      (single shot)
//!                             +-> Retrying -> AwaitingResponse   (policy rejection)
//!                             +-> Failed                         (anything else)
//! ```
//!
//! At most one request is in flight. Monitor mode sleeps for the poll
//! interval after each delivery, so the effective period is interval + RTT.
//! The transport is released exactly once per run, whatever the outcome.

use std::time::Duration;

use envoy_types::pb::envoy::service::status::v3::{ClientStatusRequest, ClientStatusResponse};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::{ClientOptions, DEFAULT_MAX_RETRIES};
use crate::csds::transport::{StatusStream, StatusTransport};
use crate::{Error, Result};

/// Receives every response a run produces
pub trait ResponseSink {
    fn deliver(&mut self, response: &ClientStatusResponse) -> Result<()>;
}

impl<F> ResponseSink for F
where
    F: FnMut(&ClientStatusResponse) -> Result<()>,
{
    fn deliver(&mut self, response: &ClientStatusResponse) -> Result<()> {
        self(response)
    }
}

/// Bounded, exponentially backed-off retry of policy rejections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Consecutive rejections tolerated before the run fails
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1u32 << exponent).min(self.max_backoff)
    }
}

/// Engine lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Connected,
    AwaitingResponse,
    Delivered,
    Retrying,
    Failed,
    Closed,
}

/// What a completed run did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Responses handed to the sink, end-of-stream included
    pub deliveries: u64,
    /// Streams reopened after a policy rejection
    pub retries: u32,
    /// The run ended on a shutdown signal
    pub stopped: bool,
}

/// Request/response driver for one status run
pub struct StreamEngine<T: StatusTransport> {
    transport: T,
    retry: RetryPolicy,
    interval: Duration,
    state: EngineState,
    released: bool,
}

impl<T: StatusTransport> std::fmt::Debug for StreamEngine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamEngine")
            .field("retry", &self.retry)
            .field("interval", &self.interval)
            .field("state", &self.state)
            .field("released", &self.released)
            .finish()
    }
}

impl<T: StatusTransport> StreamEngine<T> {
    /// Single-shot engine with the default retry policy
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            retry: RetryPolicy::default(),
            interval: Duration::ZERO,
            state: EngineState::Idle,
            released: false,
        }
    }

    pub fn from_options(transport: T, options: &ClientOptions) -> Self {
        Self::new(transport)
            .with_interval(options.monitor_interval)
            .with_retry(RetryPolicy { max_retries: options.max_retries, ..Default::default() })
    }

    /// Poll interval; zero runs a single exchange
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run until the single exchange completes, the shutdown signal fires in
    /// monitor mode, or an error ends the run.
    pub async fn run<S: ResponseSink>(
        &mut self,
        request: ClientStatusRequest,
        sink: &mut S,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<RunSummary> {
        if self.released {
            return Err(Error::config("status engine already closed"));
        }

        self.state = EngineState::Connected;
        info!(
            monitor = !self.interval.is_zero(),
            interval_ms = self.interval.as_millis() as u64,
            matchers = request.node_matchers.len(),
            "Starting status run"
        );

        let result = self.drive(&request, sink, &mut shutdown).await;

        self.transport.release();
        self.released = true;

        match &result {
            Ok(summary) => {
                self.state = EngineState::Closed;
                info!(
                    deliveries = summary.deliveries,
                    retries = summary.retries,
                    stopped = summary.stopped,
                    "Status run finished"
                );
            }
            Err(err) => {
                self.state = EngineState::Failed;
                error!(error = %err, "Status run failed");
            }
        }
        result
    }

    async fn drive<S: ResponseSink>(
        &mut self,
        request: &ClientStatusRequest,
        sink: &mut S,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let mut stream: Option<T::Stream> = None;
        let mut rejections = 0u32;

        loop {
            self.state = EngineState::AwaitingResponse;
            match self.exchange(&mut stream, request).await {
                Ok(response) => {
                    rejections = 0;
                    self.state = EngineState::Delivered;
                    sink.deliver(&response)?;
                    summary.deliveries += 1;
                }
                Err(err) if err.is_transient() => {
                    stream = None;
                    rejections += 1;
                    if rejections > self.retry.max_retries {
                        return Err(Error::TransientProtocolReject {
                            message: err.to_string(),
                            attempts: rejections,
                        });
                    }

                    self.state = EngineState::Retrying;
                    summary.retries += 1;
                    let delay = self.retry.backoff(rejections);
                    warn!(
                        attempt = rejections,
                        max_retries = self.retry.max_retries,
                        backoff_ms = delay.as_millis() as u64,
                        error = %err,
                        "Stream rejected by control plane, reopening"
                    );
                    if wait_or_shutdown(delay, shutdown).await {
                        summary.stopped = true;
                        return Ok(summary);
                    }
                    continue;
                }
                Err(err) => return Err(err),
            }

            if self.interval.is_zero() {
                if let Some(open) = stream.as_mut() {
                    open.close_send();
                }
                return Ok(summary);
            }

            if wait_or_shutdown(self.interval, shutdown).await {
                info!("Shutdown requested, stopping monitor");
                if let Some(open) = stream.as_mut() {
                    open.close_send();
                }
                summary.stopped = true;
                return Ok(summary);
            }
        }
    }

    /// Send the request and wait for one response. End-of-stream yields an
    /// empty response and drops the stream so the next poll reopens it.
    async fn exchange(
        &mut self,
        stream: &mut Option<T::Stream>,
        request: &ClientStatusRequest,
    ) -> Result<ClientStatusResponse> {
        let current = match stream.take() {
            Some(current) => current,
            None => self.transport.open_stream().await?,
        };
        let open = stream.insert(current);

        open.send(request.clone()).await?;
        let received = open.recv().await?;
        match received {
            Some(response) => {
                debug!(clients = response.config.len(), "Received status response");
                Ok(response)
            }
            None => {
                debug!("Status stream ended by server");
                *stream = None;
                Ok(ClientStatusResponse::default())
            }
        }
    }
}

/// Sleep for `delay`; returns `true` if shutdown was signalled first.
async fn wait_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return true;
    }

    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return false,
            changed = shutdown.changed() => match changed {
                Ok(()) if *shutdown.borrow() => return true,
                Ok(()) => continue,
                Err(_) => {
                    // Sender gone, no shutdown can arrive
                    (&mut sleep).await;
                    return false;
                }
            },
        }
    }
}
