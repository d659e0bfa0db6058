//! # UI transport.
//!
//! The core sends status strings through a [`StatusSink`]; inbound lines become
//! tasks. [`UdsServer`] implements both over a unix socket (one client at a
//! time). [`NullSink`] drops everything, for headless runs and tests.

#[cfg(unix)]
mod uds;

use async_trait::async_trait;

#[cfg(unix)]
pub use uds::UdsServer;

/// Outbound status channel to the UI.
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Sends `text`. Returns the number of bytes sent, 0 if nobody listens.
    async fn send_status(&self, text: &str) -> usize;
}

/// [`StatusSink`] without a client.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl StatusSink for NullSink {
    async fn send_status(&self, text: &str) -> usize {
        tracing::debug!(status = text, "status dropped: no ui");
        0
    }
}
