//! Channel construction for OperRouter gRPC clients.
//!
//! Only establishing the connection is retried; an RPC that fails on an
//! open channel is never replayed here.

use std::time::Duration;

use anyhow::Context;
use tonic::transport::{Channel, Endpoint};
use tracing::Instrument;

/// HTTP/2 keepalive pings on an otherwise idle channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keepalive {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for Keepalive {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
        }
    }
}

/// How many times to try connecting and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectPolicy {
    /// Attempts after the first one.
    pub retries: u32,
    /// Wait before retry `n` is `step * n`, capped at `cap`.
    pub step: Duration,
    pub cap: Duration,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            retries: 0,
            step: Duration::from_millis(100),
            cap: Duration::from_secs(5),
        }
    }
}

impl ConnectPolicy {
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Pause after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt).min(self.cap)
    }
}

/// Everything needed to open a channel to one OperRouter server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSettings {
    /// Deadline for the TCP + HTTP/2 handshake.
    pub connect_timeout: Option<Duration>,
    /// Deadline for every unary call on the channel.
    pub rpc_timeout: Option<Duration>,
    pub keepalive: Keepalive,
    pub connect: ConnectPolicy,
}

impl ChannelSettings {
    #[must_use]
    pub fn with_timeouts(mut self, connect: Duration, rpc: Duration) -> Self {
        self.connect_timeout = Some(connect);
        self.rpc_timeout = Some(rpc);
        self
    }

    #[must_use]
    pub fn with_connect_retries(mut self, retries: u32) -> Self {
        self.connect.retries = retries;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, step: Duration, cap: Duration) -> Self {
        self.connect.step = step;
        self.connect.cap = cap;
        self
    }

    /// Endpoint for `target` carrying these settings.
    ///
    /// # Errors
    /// Fails if `target` is not a valid URI.
    pub fn endpoint(&self, target: &str) -> anyhow::Result<Endpoint> {
        let mut endpoint = Endpoint::from_shared(target.to_owned())
            .with_context(|| format!("invalid gRPC target `{target}`"))?
            .tcp_keepalive(Some(self.keepalive.interval))
            .http2_keep_alive_interval(self.keepalive.interval)
            .keep_alive_timeout(self.keepalive.timeout)
            .keep_alive_while_idle(true);

        if let Some(timeout) = self.connect_timeout {
            endpoint = endpoint.connect_timeout(timeout);
        }
        if let Some(timeout) = self.rpc_timeout {
            endpoint = endpoint.timeout(timeout);
        }
        Ok(endpoint)
    }
}

/// Open a channel to `uri`, retrying per [`ConnectPolicy`].
///
/// # Errors
/// Returns the last connection error once every attempt has failed, or the
/// URI error straight away.
pub async fn open_channel(uri: &str, settings: &ChannelSettings) -> anyhow::Result<Channel> {
    let endpoint = settings.endpoint(uri)?;
    let attempts = settings.connect.attempts();
    let mut attempt = 1;

    loop {
        let span = tracing::debug_span!("grpc_connect", uri, attempt);
        match endpoint.connect().instrument(span).await {
            Ok(channel) => {
                tracing::info!(uri, attempt, "gRPC channel open");
                return Ok(channel);
            }
            Err(e) if attempt < attempts => {
                let delay = settings.connect.delay_after(attempt);
                tracing::warn!(uri, attempt, attempts, error = %e, ?delay, "gRPC connect failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("no connection to {uri} after {attempt} attempt(s)")
                });
            }
        }
    }
}
