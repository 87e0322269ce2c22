//! Temporal state derivation: orientation delta, rotation speed, obstacle
//! delta, approach speed, danger level, alert priority.
//!
//! `TemporalState` retains only the current filtered packet plus the
//! *derived* deltas against the previous state — not the previous state
//! itself. Once built, a state has no reference back to its predecessor,
//! so the pipeline can drop the old one immediately.

use cane_contracts::Packet;

/// Per-axis IMU deltas, shortest-path normalized to `(-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuDelta {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

/// Signed obstacle-distance deltas. Negative means the obstacle moved
/// closer; positive means it receded or disappeared.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ObstacleDelta {
    pub upper: Option<f64>,
    pub lower: Option<f64>,
}

/// Shortest-path angle delta from `previous` to `current`, normalized to
/// `(-180, 180]`.
pub fn angle_delta(current: f64, previous: f64) -> f64 {
    let wrapped = (current - previous + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 {
        180.0
    } else {
        wrapped
    }
}

/// Signed delta for one obstacle direction, handling appearance/disappearance:
/// null→value is treated as an approach (negative delta), value→null as a
/// recession (positive delta).
fn obstacle_delta_one(previous: Option<f64>, current: Option<f64>) -> Option<f64> {
    match (previous, current) {
        (None, None) => None,
        (None, Some(v)) => Some(-v),
        (Some(v), None) => Some(v),
        (Some(p), Some(c)) => Some(c - p),
    }
}

/// Minimum angular speed, in degrees/second, considered "fast".
pub const FAST_ROTATION_DEG_PER_S: f64 = 30.0;
/// Obstacle closing distance beyond which we call it "approaching".
pub const APPROACH_DELTA_M: f64 = 0.1;
/// `danger_level` threshold for `requires_immediate_alert`.
pub const IMMEDIATE_DANGER_LEVEL: f64 = 1.5;
/// `approach_speed` threshold for `requires_immediate_alert`.
pub const IMMEDIATE_APPROACH_SPEED_MPS: f64 = 0.5;

/// A filtered packet plus everything derived from comparing it to the
/// previous cycle. Constructed once per pipeline tick and never mutated.
#[derive(Debug, Clone)]
pub struct TemporalState {
    pub packet: Packet,
    /// Wall-clock time this state was built, independent of the packet's
    /// own timestamp (the pipeline may have delayed it in the filter).
    pub created_at_ms: i64,
    pub imu_delta: Option<ImuDelta>,
    pub rotation_speed: Option<f64>,
    pub is_rotating_fast: bool,
    pub obstacle_delta: ObstacleDelta,
    pub approach_speed: Option<f64>,
    pub is_approaching_obstacle: bool,
    pub danger_level: f64,
    /// 0 (none) .. 3 (highest).
    pub alert_priority: u8,
}

impl TemporalState {
    pub fn from_packet(packet: Packet, created_at_ms: i64, previous: Option<&TemporalState>) -> Self {
        let dt_s = previous.and_then(|p| {
            let diff_ms = created_at_ms - p.created_at_ms;
            (diff_ms > 0).then_some(diff_ms as f64 / 1000.0)
        });

        let imu_delta = previous.zip(dt_s).map(|(prev, _)| ImuDelta {
            yaw: angle_delta(packet.imu.yaw, prev.packet.imu.yaw),
            pitch: angle_delta(packet.imu.pitch, prev.packet.imu.pitch),
            roll: angle_delta(packet.imu.roll, prev.packet.imu.roll),
        });

        let rotation_speed = imu_delta.zip(dt_s).map(|(d, dt)| {
            (d.yaw * d.yaw + d.pitch * d.pitch + d.roll * d.roll).sqrt() / dt
        });
        let is_rotating_fast = rotation_speed.is_some_and(|s| s > FAST_ROTATION_DEG_PER_S);

        let obstacle_delta = match previous {
            Some(prev) => ObstacleDelta {
                upper: obstacle_delta_one(prev.packet.obstacles.upper, packet.obstacles.upper),
                lower: obstacle_delta_one(prev.packet.obstacles.lower, packet.obstacles.lower),
            },
            None => ObstacleDelta::default(),
        };

        let approach_speed = dt_s.and_then(|dt| {
            let max_abs = [obstacle_delta.upper, obstacle_delta.lower]
                .into_iter()
                .flatten()
                .map(f64::abs)
                .fold(None::<f64>, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))));
            max_abs.map(|m| m / dt)
        });

        let is_approaching_obstacle = [obstacle_delta.upper, obstacle_delta.lower]
            .into_iter()
            .flatten()
            .any(|d| d <= -APPROACH_DELTA_M);

        let stale = packet.stale(created_at_ms);
        let danger_level = packet.obstacles.danger_score()
            + if stale { 0.5 } else { 0.0 }
            + approach_speed.unwrap_or(0.0) * 3.0
            + if is_rotating_fast { 0.3 } else { 0.0 };

        let alert_priority = match danger_level {
            d if d < 0.3 => 0,
            d if d < 0.8 => 1,
            d if d < IMMEDIATE_DANGER_LEVEL => 2,
            _ => 3,
        };

        Self {
            packet,
            created_at_ms,
            imu_delta,
            rotation_speed,
            is_rotating_fast,
            obstacle_delta,
            approach_speed,
            is_approaching_obstacle,
            danger_level,
            alert_priority,
        }
    }

    /// packet's freshness, evaluated against this state's own creation
    /// time rather than a caller-supplied "now".
    pub fn fresh(&self) -> bool {
        self.packet.fresh(self.created_at_ms)
    }

    pub fn stale(&self) -> bool {
        self.packet.stale(self.created_at_ms)
    }

    /// Fires when the danger level or the closing rate crosses the
    /// emergency thresholds. The wire packet carries no "immediate" flag
    /// of its own, so this derives solely from the state's own computed
    /// quantities.
    pub fn requires_immediate_alert(&self) -> bool {
        self.danger_level > IMMEDIATE_DANGER_LEVEL
            || self.approach_speed.is_some_and(|s| s > IMMEDIATE_APPROACH_SPEED_MPS)
    }
}
