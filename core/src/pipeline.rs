//! # pipeline
//!
//! Stream orchestrator: ingest → validate → filter → state → GPS update →
//! evaluate → emit instruction.
//!
//! ## Architecture
//! Runs as its own Tokio task, fed by an `mpsc` channel of packets from the
//! BLE transport and broadcasting [`PipelineEvent`]s to any number of
//! observers (state-stream subscribers, the guidance executor, a UI).
//! Mirrors the teacher's `uwb_hub::start_uwb_hub` shape: bind/subscribe
//! once, `loop { recv().await; process(...) }`, never let one bad packet
//! take the task down.
//!
//! ## Invariants
//! - Packet processing is strictly one-at-a-time and FIFO — the engine's
//!   deduplication cache is race-free because nothing else ever touches
//!   it concurrently.
//! - `stop()` cancels the packet subscription; at most one in-flight
//!   utterance drains afterward (handled by the guidance executor, not here).

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use cane_contracts::{Packet, Waypoint};

use crate::engine::ExpertEngine;
use crate::error::GuidanceError;
use crate::filter::SensorFilter;
use crate::navigator::{NavEvent, RouteNavigator};
use crate::snapshot::{self, Snapshot};
use crate::state::TemporalState;

pub struct PipelineConfig {
    pub filter_window: usize,
    pub reached_threshold_m: f64,
    /// Consecutive invalid fixes before `GpsLostDuringNavigation` arms
    /// (default 3).
    pub gps_loss_threshold: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filter_window: std::env::var("CANE_FILTER_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(crate::filter::DEFAULT_WINDOW),
            reached_threshold_m: std::env::var("CANE_REACHED_THRESHOLD_M")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(crate::navigator::DEFAULT_REACHED_THRESHOLD_M),
            gps_loss_threshold: std::env::var("CANE_GPS_LOSS_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStats {
    pub received: u64,
    pub processed: u64,
    pub errored: u64,
}

/// Stats plus the two other on-demand readouts: filter warm-up and
/// navigator progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSnapshot {
    pub stats: PipelineStats,
    pub filter_warmed_up: bool,
    pub navigator_progress: f64,
}

/// One outcome of processing a single packet. A tick can produce zero or
/// more of these (at most one `State`, any number of nav events, at most
/// one `Instruction` or `Dropped`).
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    State(TemporalState),
    WaypointReached(Waypoint),
    DestinationReached,
    Instruction { instruction: cane_contracts::Instruction, snapshot: Snapshot },
    Dropped(GuidanceError),
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// The synchronous decision pipeline. `process_packet` is the pure,
/// single-threaded core; `run` is the async wrapper that drives it off a
/// channel, keeping all pipeline stages on one logical task.
pub struct Pipeline {
    filter: SensorFilter,
    navigator: RouteNavigator,
    engine: ExpertEngine,
    last_state: Option<TemporalState>,
    stats: PipelineStats,
    consecutive_invalid_fixes: u32,
    gps_loss_threshold: u32,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            filter: SensorFilter::new(config.filter_window),
            navigator: RouteNavigator::new().with_reached_threshold(config.reached_threshold_m),
            engine: ExpertEngine::new(),
            last_state: None,
            stats: PipelineStats::default(),
            consecutive_invalid_fixes: 0,
            gps_loss_threshold: config.gps_loss_threshold,
        }
    }

    pub fn navigator_mut(&mut self) -> &mut RouteNavigator {
        &mut self.navigator
    }

    pub fn get_stats(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            stats: self.stats.clone(),
            filter_warmed_up: self.filter.is_warmed_up(),
            navigator_progress: self.navigator.progress(),
        }
    }

    /// Runs one packet through validate → filter → state → GPS update →
    /// evaluate. Never panics; every failure mode becomes a `Dropped`
    /// event and a counter increment.
    pub fn process_packet(&mut self, packet: Packet, now_ms: i64) -> Vec<PipelineEvent> {
        self.stats.received += 1;
        let mut events = Vec::new();

        let age_ms = packet.age_ms(now_ms);
        if age_ms > cane_contracts::MAX_VALID_AGE_MS {
            self.stats.errored += 1;
            events.push(PipelineEvent::Dropped(GuidanceError::StalePacket {
                age_ms,
                max_age_ms: cane_contracts::MAX_VALID_AGE_MS,
            }));
            return events;
        }
        if packet.imu.is_nan() {
            self.stats.errored += 1;
            events.push(PipelineEvent::Dropped(GuidanceError::InvalidState {
                reason: "IMU reading contains NaN".to_string(),
            }));
            return events;
        }

        let filtered = match self.filter.filter(&packet) {
            Ok(p) => p,
            Err(e) => {
                self.stats.errored += 1;
                events.push(PipelineEvent::Dropped(e.into()));
                return events;
            }
        };

        let state = TemporalState::from_packet(filtered, now_ms, self.last_state.as_ref());
        self.stats.processed += 1;

        if packet.gps.valid() {
            self.consecutive_invalid_fixes = 0;
            self.engine.set_gps_lost(false);
            for nav_event in self.navigator.update_position(&packet.gps) {
                match nav_event {
                    NavEvent::WaypointReached(w) => events.push(PipelineEvent::WaypointReached(w)),
                    NavEvent::DestinationReached => events.push(PipelineEvent::DestinationReached),
                }
            }
        } else if self.navigator.has_active_destination() {
            self.consecutive_invalid_fixes += 1;
            if self.consecutive_invalid_fixes >= self.gps_loss_threshold {
                self.engine.set_gps_lost(true);
            }
        }

        self.last_state = Some(state.clone());

        match snapshot::build(&state, Some(&self.navigator)) {
            Ok(snap) => match self.engine.evaluate(&snap) {
                Ok(Some(instruction)) => events.push(PipelineEvent::Instruction { instruction, snapshot: snap }),
                Ok(None) => {}
                Err(e) => {
                    self.stats.errored += 1;
                    events.push(PipelineEvent::Dropped(e));
                }
            },
            Err(reason) => debug!("pipeline: snapshot gate rejected this tick: {reason}"),
        }

        events.push(PipelineEvent::State(state));
        events
    }

    /// Drives `process_packet` off `packet_rx` until the source closes or
    /// `stop_rx` reports a stop request, broadcasting every event. Returns
    /// `self` so the caller can inspect final stats or `restart` it.
    pub async fn run(
        mut self,
        mut packet_rx: mpsc::Receiver<Packet>,
        event_tx: broadcast::Sender<PipelineEvent>,
        mut stop_rx: watch::Receiver<bool>,
    ) -> Self {
        info!("pipeline: started");
        loop {
            tokio::select! {
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        info!("pipeline: stop requested");
                        break;
                    }
                }
                packet = packet_rx.recv() => {
                    match packet {
                        Some(p) => {
                            for event in self.process_packet(p, now_ms()) {
                                if let Err(e) = event_tx.send(event) {
                                    debug!("pipeline: no subscribers for event: {e}");
                                }
                            }
                        }
                        None => {
                            warn!("pipeline: packet source closed");
                            break;
                        }
                    }
                }
            }
        }
        self
    }
}

/// Handle to a running pipeline task — `start`/`stop`/`restart`/`dispose`.
pub struct PipelineHandle {
    stop_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<Pipeline>,
}

impl PipelineHandle {
    pub fn start(pipeline: Pipeline, packet_rx: mpsc::Receiver<Packet>, event_tx: broadcast::Sender<PipelineEvent>) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(pipeline.run(packet_rx, event_tx, stop_rx));
        Self { stop_tx, task }
    }

    /// Signals the task to stop and waits for it to finish, returning the
    /// pipeline so its accumulated state (stats, filter, navigator) can be
    /// reused by `restart`.
    pub async fn stop(self) -> Pipeline {
        let _ = self.stop_tx.send(true);
        self.task.await.unwrap_or_else(|e| {
            warn!("pipeline: task panicked while stopping: {e}");
            Pipeline::new(PipelineConfig::default())
        })
    }

    pub async fn restart(self, packet_rx: mpsc::Receiver<Packet>, event_tx: broadcast::Sender<PipelineEvent>) -> Self {
        let pipeline = self.stop().await;
        Self::start(pipeline, packet_rx, event_tx)
    }

    pub async fn dispose(self) {
        let _ = self.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cane_contracts::{FixKind, GpsFix, Imu, ObstaclePair, WaterSensor};

    fn packet(timestamp_ms: i64) -> Packet {
        Packet {
            timestamp_ms,
            imu: Imu::new(0.0, 0.0, 0.0).unwrap(),
            obstacles: ObstaclePair::new(Some(3.0), Some(3.0), 0.0).unwrap(),
            water: WaterSensor::new(0.0, None).unwrap(),
            gps: GpsFix {
                fix_kind: FixKind::None,
                ..GpsFix::default()
            },
        }
    }

    #[test]
    fn stale_packet_is_dropped_and_counted() {
        let mut pipeline = Pipeline::new(PipelineConfig::default());
        let events = pipeline.process_packet(packet(0), 10_000);
        assert!(matches!(events[0], PipelineEvent::Dropped(GuidanceError::StalePacket { .. })));
        assert_eq!(pipeline.get_stats().stats.errored, 1);
    }

    #[test]
    fn fresh_packet_produces_a_state_event() {
        let mut pipeline = Pipeline::new(PipelineConfig::default());
        let events = pipeline.process_packet(packet(1_000), 1_000);
        assert!(events.iter().any(|e| matches!(e, PipelineEvent::State(_))));
        assert_eq!(pipeline.get_stats().stats.processed, 1);
    }

    #[test]
    fn clear_path_emits_an_instruction_on_first_tick() {
        let mut pipeline = Pipeline::new(PipelineConfig::default());
        let events = pipeline.process_packet(packet(1_000), 1_000);
        assert!(events.iter().any(|e| matches!(e, PipelineEvent::Instruction { .. })));
    }

    #[test]
    fn gps_loss_arms_after_three_consecutive_invalid_fixes() {
        let mut pipeline = Pipeline::new(PipelineConfig::default());
        pipeline
            .navigator_mut()
            .load_destination(cane_contracts::Destination {
                name: "Park".into(),
                transport_mode: cane_contracts::TransportMode::Walking,
                total_distance_meters: None,
                estimated_time_seconds: None,
                waypoints: vec![
                    cane_contracts::Waypoint {
                        lat: 0.0,
                        lon: 0.0,
                        name: None,
                        instruction: None,
                        kind: cane_contracts::WaypointKind::Start,
                    },
                    cane_contracts::Waypoint {
                        lat: 0.0,
                        lon: 1.0,
                        name: None,
                        instruction: None,
                        kind: cane_contracts::WaypointKind::Destination,
                    },
                ],
            })
            .unwrap();

        let mut last_events = Vec::new();
        for i in 0..3 {
            last_events = pipeline.process_packet(packet(1_000 + i), 1_000 + i);
        }
        let instruction = last_events
            .iter()
            .find_map(|e| match e {
                PipelineEvent::Instruction { instruction, .. } => Some(instruction),
                _ => None,
            })
            .expect("an instruction should fire once GPS is lost");
        assert_eq!(instruction.message, "GPS lost, navigation suspended");
    }
}
