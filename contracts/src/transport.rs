//! The BLE transport capability — an external collaborator. The device is
//! advertised by name (e.g. "OPEN-EYES"); service/characteristic UUIDs are
//! the concrete implementation's runtime configuration. The transport is
//! responsible for bytes-to-JSON parsing; the core never sees raw frames.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

use crate::sensor::Packet;

#[derive(Debug, Clone, Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// Capability interface for the external BLE transport.
#[async_trait]
pub trait BleTransport: Send + Sync {
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Pull the next packet off the stream, or `None` once the stream has
    /// ended (disconnect, or the underlying device going away).
    async fn next_packet(&mut self) -> Option<Packet>;

    async fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// A live view of the connection state, for observers that want to
    /// react to connect/disconnect events without polling `is_connected`.
    fn connection_state(&self) -> watch::Receiver<bool>;
}
