//! In-memory status transport driven by a script of stream events.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use envoy_types::pb::envoy::service::status::v3::{ClientStatusRequest, ClientStatusResponse};
use tonic::Status;

use csds_client::csds::{StatusStream, StatusTransport};
use csds_client::{Error, Result};

/// What the next `recv` on a scripted stream yields
#[derive(Debug, Clone)]
pub enum Step {
    Respond(ClientStatusResponse),
    EndOfStream,
    Fail(Status),
}

impl Step {
    /// Rejection carrying the control plane's security policy marker
    pub fn policy_reject() -> Self {
        Step::Fail(Status::permission_denied("request denied by RpcSecurityPolicy"))
    }
}

/// Counters shared between a transport, its streams and the test
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransportLog {
    pub opened: usize,
    pub sent: usize,
    pub closed_send: usize,
    pub released: usize,
}

pub struct ScriptedTransport {
    streams: VecDeque<Vec<Step>>,
    log: Arc<Mutex<TransportLog>>,
}

impl ScriptedTransport {
    /// One entry per stream the engine may open
    pub fn new(streams: Vec<Vec<Step>>) -> Self {
        Self { streams: streams.into(), log: Arc::new(Mutex::new(TransportLog::default())) }
    }

    pub fn log(&self) -> TransportLog {
        self.log.lock().unwrap().clone()
    }
}

pub struct ScriptedStream {
    steps: VecDeque<Step>,
    log: Arc<Mutex<TransportLog>>,
}

#[async_trait]
impl StatusStream for ScriptedStream {
    async fn send(&mut self, _request: ClientStatusRequest) -> Result<()> {
        self.log.lock().unwrap().sent += 1;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<ClientStatusResponse>> {
        match self.steps.pop_front() {
            Some(Step::Respond(response)) => Ok(Some(response)),
            Some(Step::EndOfStream) | None => Ok(None),
            Some(Step::Fail(status)) => Err(Error::Protocol(status)),
        }
    }

    fn close_send(&mut self) {
        self.log.lock().unwrap().closed_send += 1;
    }
}

#[async_trait]
impl StatusTransport for ScriptedTransport {
    type Stream = ScriptedStream;

    async fn open_stream(&mut self) -> Result<ScriptedStream> {
        let steps = self
            .streams
            .pop_front()
            .ok_or_else(|| Error::Protocol(Status::unavailable("no scripted stream left")))?;
        self.log.lock().unwrap().opened += 1;
        Ok(ScriptedStream { steps: steps.into(), log: Arc::clone(&self.log) })
    }

    fn release(&mut self) {
        self.log.lock().unwrap().released += 1;
    }
}
