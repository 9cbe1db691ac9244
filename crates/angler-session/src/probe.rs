//! Liveness probe: is anyone answering at that address?

use std::future::Future;
use std::time::Duration;

use angler_protocol::{Codec, JsonCodec, Packet, StatusReport};
use angler_transport::{Connection, Connector, TcpConnector};

use crate::ProbeError;

/// How long a probe may take end to end.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Asks a server for its status before the real session is opened.
pub trait Prober: Send + Sync + 'static {
    /// Probes `host:port`. The report carries the protocol version the
    /// server speaks.
    fn probe(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<StatusReport, ProbeError>> + Send;
}

/// Probes over a framed TCP connection.
///
/// Sends one [`Packet::StatusRequest`] and decodes the first frame that
/// comes back as a [`StatusReport`].
#[derive(Debug, Clone)]
pub struct TcpProber<C = JsonCodec> {
    connector: TcpConnector,
    codec: C,
    timeout: Duration,
}

impl TcpProber<JsonCodec> {
    pub fn new() -> Self {
        Self::with_codec(JsonCodec)
    }
}

impl Default for TcpProber<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> TcpProber<C> {
    pub fn with_codec(codec: C) -> Self {
        Self {
            connector: TcpConnector::with_timeout(PROBE_TIMEOUT),
            codec,
            timeout: PROBE_TIMEOUT,
        }
    }

    /// Overrides the end-to-end timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn exchange(&self, host: &str, port: u16) -> Result<StatusReport, ProbeError> {
        let conn = self.connector.open(host, port).await?;
        let result: Result<StatusReport, ProbeError> = async {
            conn.send(&self.codec.encode(&Packet::StatusRequest)?).await?;
            let frame = conn.recv().await?.ok_or(ProbeError::NoAnswer)?;
            Ok(self.codec.decode::<StatusReport>(&frame)?)
        }
        .await;
        conn.close().await;
        result
    }
}

impl<C: Codec> Prober for TcpProber<C> {
    async fn probe(&self, host: &str, port: u16) -> Result<StatusReport, ProbeError> {
        tracing::info!(%host, port, "server-pinging");
        match tokio::time::timeout(self.timeout, self.exchange(host, port)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout),
        }
    }
}
