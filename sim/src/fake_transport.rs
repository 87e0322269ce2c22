//! A scripted `BleTransport` that replays a fixed packet sequence instead of
//! talking to real hardware.
//!
//! Grounded on `udp_tx::UdpTransmitter`'s "send, log failure, never panic"
//! posture, adapted here to the read side: `next_packet` pops from a
//! pre-built queue and never errors, since there is no socket to fail.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use cane_contracts::{BleTransport, Packet, TransportError};

pub struct ScriptedTransport {
    queue: VecDeque<Packet>,
    tick: Duration,
    connected: bool,
    connected_tx: watch::Sender<bool>,
    connected_rx: watch::Receiver<bool>,
}

impl ScriptedTransport {
    pub fn new(packets: Vec<Packet>, tick: Duration) -> Self {
        let (connected_tx, connected_rx) = watch::channel(false);
        Self {
            queue: packets.into(),
            tick,
            connected: false,
            connected_tx,
            connected_rx,
        }
    }
}

#[async_trait]
impl BleTransport for ScriptedTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        let _ = self.connected_tx.send(true);
        debug!("fake transport: connected ({} packets queued)", self.queue.len());
        Ok(())
    }

    async fn next_packet(&mut self) -> Option<Packet> {
        if !self.connected {
            return None;
        }
        tokio::time::sleep(self.tick).await;
        self.queue.pop_front()
    }

    async fn disconnect(&mut self) {
        self.connected = false;
        let _ = self.connected_tx.send(false);
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connection_state(&self) -> watch::Receiver<bool> {
        self.connected_rx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cane_contracts::{FixKind, GpsFix, Imu, ObstaclePair, WaterSensor};

    fn packet() -> Packet {
        Packet {
            timestamp_ms: 0,
            imu: Imu::new(0.0, 0.0, 0.0).unwrap(),
            obstacles: ObstaclePair::new(None, None, 0.0).unwrap(),
            water: WaterSensor::new(0.0, None).unwrap(),
            gps: GpsFix {
                fix_kind: FixKind::None,
                ..GpsFix::default()
            },
        }
    }

    #[tokio::test]
    async fn replays_packets_in_order_then_ends() {
        let mut transport = ScriptedTransport::new(vec![packet(), packet()], Duration::from_millis(1));
        transport.connect().await.unwrap();
        assert!(transport.next_packet().await.is_some());
        assert!(transport.next_packet().await.is_some());
        assert!(transport.next_packet().await.is_none());
    }

    #[tokio::test]
    async fn disconnected_transport_yields_no_packets() {
        let mut transport = ScriptedTransport::new(vec![packet()], Duration::from_millis(1));
        assert!(transport.next_packet().await.is_none());
    }
}
