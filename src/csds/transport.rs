//! Bidirectional status stream.
//!
//! The engine talks to the control plane through two seams:
//! [`StatusTransport`] owns the channel and opens streams, [`StatusStream`] is
//! one open `StreamClientStatus` call. [`GrpcTransport`] implements both on a
//! tonic channel; tests script them in memory.

use std::sync::Arc;

use async_trait::async_trait;
use envoy_types::pb::envoy::service::status::v3::{ClientStatusRequest, ClientStatusResponse};
use http::uri::PathAndQuery;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::client::Grpc;
use tonic::metadata::AsciiMetadataValue;
use tonic::transport::Channel;
use tonic::{Request, Status, Streaming};
use tonic_prost::ProstCodec;
use tracing::{debug, trace};

use crate::auth::CallCredentials;
use crate::csds::schema::StatusSchema;
use crate::{Error, Result};

/// Outbound requests buffered per stream
const OUTBOUND_BUFFER: usize = 4;

/// One open status stream
#[async_trait]
pub trait StatusStream: Send {
    /// Queue a request on the stream
    async fn send(&mut self, request: ClientStatusRequest) -> Result<()>;

    /// Next response; `None` on a clean end-of-stream
    async fn recv(&mut self) -> Result<Option<ClientStatusResponse>>;

    /// Half-close the send side
    fn close_send(&mut self);
}

/// Channel holder that opens status streams
#[async_trait]
pub trait StatusTransport: Send {
    type Stream: StatusStream;

    /// Open a fresh stream on the held channel
    async fn open_stream(&mut self) -> Result<Self::Stream>;

    /// Drop the channel. Called exactly once per run.
    fn release(&mut self);
}

/// [`StatusTransport`] over a tonic channel
pub struct GrpcTransport {
    channel: Option<Channel>,
    schema: StatusSchema,
    credentials: Arc<dyn CallCredentials>,
}

impl GrpcTransport {
    pub fn new(channel: Channel, schema: StatusSchema, credentials: Arc<dyn CallCredentials>) -> Self {
        Self { channel: Some(channel), schema, credentials }
    }
}

impl std::fmt::Debug for GrpcTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrpcTransport")
            .field("connected", &self.channel.is_some())
            .field("schema", &self.schema)
            .finish()
    }
}

#[async_trait]
impl StatusTransport for GrpcTransport {
    type Stream = GrpcStatusStream;

    async fn open_stream(&mut self) -> Result<GrpcStatusStream> {
        let channel = self
            .channel
            .clone()
            .ok_or_else(|| Error::Protocol(Status::unavailable("channel already released")))?;

        let metadata = self.credentials.metadata().await?;
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);

        debug!(path = self.schema.stream_path(), "Opening status stream");
        Ok(GrpcStatusStream {
            grpc: Grpc::new(channel),
            path: self.schema.stream_path(),
            metadata,
            tx: Some(tx),
            pending: Some(rx),
            inbound: None,
        })
    }

    fn release(&mut self) {
        if self.channel.take().is_some() {
            debug!("Released control plane channel");
        }
    }
}

/// One `StreamClientStatus` call.
///
/// The call is started lazily by the first `send`, so the first request is
/// already queued when the call waits for response headers.
pub struct GrpcStatusStream {
    grpc: Grpc<Channel>,
    path: &'static str,
    metadata: Vec<(&'static str, String)>,
    tx: Option<mpsc::Sender<ClientStatusRequest>>,
    pending: Option<mpsc::Receiver<ClientStatusRequest>>,
    inbound: Option<Streaming<ClientStatusResponse>>,
}

impl GrpcStatusStream {
    async fn start(&mut self, rx: mpsc::Receiver<ClientStatusRequest>) -> Result<()> {
        self.grpc
            .ready()
            .await
            .map_err(|e| Error::Protocol(Status::unavailable(format!("channel not ready: {}", e))))?;

        let mut request = Request::new(ReceiverStream::new(rx));
        for (key, value) in &self.metadata {
            let value: AsciiMetadataValue = value.parse().map_err(|_| {
                Error::config(format!("metadata value for {} is not valid ASCII", key))
            })?;
            request.metadata_mut().insert(*key, value);
        }

        let codec: ProstCodec<ClientStatusRequest, ClientStatusResponse> = ProstCodec::default();
        let response = self
            .grpc
            .streaming(request, PathAndQuery::from_static(self.path), codec)
            .await?;

        self.inbound = Some(response.into_inner());
        Ok(())
    }
}

#[async_trait]
impl StatusStream for GrpcStatusStream {
    async fn send(&mut self, request: ClientStatusRequest) -> Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| Error::Protocol(Status::failed_precondition("send side closed")))?;

        tx.send(request)
            .await
            .map_err(|_| Error::Protocol(Status::cancelled("status stream closed by peer")))?;
        trace!("Queued status request");

        if let Some(rx) = self.pending.take() {
            self.start(rx).await?;
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<ClientStatusResponse>> {
        let inbound = self
            .inbound
            .as_mut()
            .ok_or_else(|| Error::Protocol(Status::failed_precondition("recv before send")))?;

        Ok(inbound.message().await?)
    }

    fn close_send(&mut self) {
        self.tx = None;
        self.pending = None;
    }
}
