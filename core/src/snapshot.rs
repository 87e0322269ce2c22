//! Snapshot adapter: fuses filtered state + GPS context into the single
//! `Snapshot` consumed by the expert rule engine.
//!
//! `build` is a pure function — no mutable state, no I/O — mirroring the
//! teacher's `FusedNode::from_envelope` mapping-with-derived-booleans shape.

use cane_contracts::Waypoint;

use crate::navigator::RouteNavigator;
use crate::state::{angle_delta, TemporalState};

/// Obstacle direction not currently swept by the servo defaults to this
/// many meters — effectively "clear".
pub const UNSWEPT_DEFAULT_M: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuSnapshot {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

/// The flattened, decision-ready view consumed by the rule engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub front: f64,
    pub left: f64,
    pub right: f64,
    pub obstacle_high: bool,
    pub water_detected: bool,
    pub imu: ImuSnapshot,
    pub timestamp_ms: i64,

    pub target_bearing: Option<f64>,
    pub heading_deviation: Option<f64>,
    pub distance_to_destination: Option<f64>,
    pub destination_name: Option<String>,
    pub distance_to_next_waypoint: Option<f64>,
    pub next_waypoint_name: Option<String>,
}

impl Snapshot {
    pub fn has_obstacle_front(&self) -> bool {
        self.front < 1.5
    }

    pub fn has_obstacle_left(&self) -> bool {
        self.left < 0.8
    }

    pub fn has_obstacle_right(&self) -> bool {
        self.right < 0.8
    }

    pub fn is_deviating(&self) -> bool {
        self.imu.yaw.abs() > 15.0
    }

    pub fn has_active_destination(&self) -> bool {
        self.destination_name.is_some()
    }

    pub fn is_off_course(&self) -> bool {
        self.heading_deviation.is_some_and(|d| d.abs() > 15.0)
    }

    pub fn is_strongly_off_course(&self) -> bool {
        self.heading_deviation.is_some_and(|d| d.abs() > 45.0)
    }

    pub fn is_near_waypoint(&self) -> bool {
        self.distance_to_next_waypoint.is_some_and(|d| d < 15.0)
    }

    pub fn is_near_destination(&self) -> bool {
        self.distance_to_destination.is_some_and(|d| d < 10.0)
    }
}

fn waypoint_name(waypoint: &Waypoint) -> Option<String> {
    waypoint.name.clone()
}

/// Maps the servo-mounted lower sensor's current sweep angle onto
/// front/left/right. Directions not currently swept default to
/// `UNSWEPT_DEFAULT_M`.
fn map_obstacle_distances(upper: Option<f64>, lower: Option<f64>, servo_angle: f64) -> (f64, f64, f64) {
    let swept = lower.unwrap_or(UNSWEPT_DEFAULT_M);
    let upper_or_default = upper.unwrap_or(UNSWEPT_DEFAULT_M);

    if servo_angle.abs() <= 30.0 {
        (swept, UNSWEPT_DEFAULT_M, UNSWEPT_DEFAULT_M)
    } else if servo_angle > 30.0 {
        (upper_or_default, UNSWEPT_DEFAULT_M, swept)
    } else {
        (upper_or_default, swept, UNSWEPT_DEFAULT_M)
    }
}

/// Builds the decision-ready snapshot from the current temporal state and
/// (optionally) the route navigator. Returns a diagnostic string instead of
/// a snapshot when the validation gate fails: the state must be fresh and
/// no IMU component may be NaN.
pub fn build(state: &TemporalState, navigator: Option<&RouteNavigator>) -> Result<Snapshot, String> {
    if state.packet.imu.is_nan() {
        return Err("snapshot rejected: IMU reading contains NaN".to_string());
    }
    if !state.fresh() {
        return Err("snapshot rejected: state is not fresh".to_string());
    }

    let (mut front, mut left, mut right) = map_obstacle_distances(
        state.packet.obstacles.upper,
        state.packet.obstacles.lower,
        state.packet.obstacles.servo_angle,
    );

    if state.is_approaching_obstacle {
        let attenuation = 1.0 - (state.approach_speed.unwrap_or(0.0) * 0.2).clamp(0.0, 0.3);
        front *= attenuation;
        left *= attenuation;
        right *= attenuation;
    }

    let obstacle_high = state.packet.obstacles.upper.is_some_and(|u| u < 1.5);
    let water_detected = state.packet.water.is_danger() || state.packet.water.submerged();

    let (
        target_bearing,
        distance_to_destination,
        destination_name,
        distance_to_next_waypoint,
        next_waypoint_name,
    ) = match navigator.filter(|n| n.has_active_destination()) {
        Some(nav) => (
            nav.target_bearing(),
            nav.distance_to_destination(),
            nav.destination().map(|d| d.name.clone()),
            nav.distance_to_current_waypoint(),
            nav.current_waypoint().and_then(waypoint_name),
        ),
        None => (None, None, None, None, None),
    };

    let heading_source = state.packet.gps.heading.unwrap_or(state.packet.imu.yaw);
    let heading_deviation = target_bearing.map(|bearing| angle_delta(heading_source, bearing));

    Ok(Snapshot {
        front,
        left,
        right,
        obstacle_high,
        water_detected,
        imu: ImuSnapshot {
            yaw: state.packet.imu.yaw,
            pitch: state.packet.imu.pitch,
            roll: state.packet.imu.roll,
        },
        timestamp_ms: state.packet.timestamp_ms,
        target_bearing,
        heading_deviation,
        distance_to_destination,
        destination_name,
        distance_to_next_waypoint,
        next_waypoint_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cane_contracts::{FixKind, GpsFix, Imu, ObstaclePair, WaterSensor};

    fn base_packet() -> cane_contracts::Packet {
        cane_contracts::Packet {
            timestamp_ms: 1_000,
            imu: Imu::new(0.0, 0.0, 0.0).unwrap(),
            obstacles: ObstaclePair::new(Some(2.0), Some(2.0), 0.0).unwrap(),
            water: WaterSensor::new(0.0, None).unwrap(),
            gps: GpsFix {
                fix_kind: FixKind::None,
                ..GpsFix::default()
            },
        }
    }

    #[test]
    fn center_sweep_maps_lower_to_front() {
        let state = TemporalState::from_packet(base_packet(), 1_000, None);
        let snap = build(&state, None).unwrap();
        assert_eq!(snap.front, 2.0);
        assert_eq!(snap.left, UNSWEPT_DEFAULT_M);
        assert_eq!(snap.right, UNSWEPT_DEFAULT_M);
    }

    #[test]
    fn right_sweep_maps_lower_to_right_and_upper_to_front() {
        let mut packet = base_packet();
        packet.obstacles = ObstaclePair::new(Some(3.0), Some(0.5), 45.0).unwrap();
        let state = TemporalState::from_packet(packet, 1_000, None);
        let snap = build(&state, None).unwrap();
        assert_eq!(snap.right, 0.5);
        assert_eq!(snap.front, 3.0);
        assert_eq!(snap.left, UNSWEPT_DEFAULT_M);
    }

    #[test]
    fn nan_imu_fails_the_gate() {
        let mut packet = base_packet();
        packet.imu = Imu { yaw: f64::NAN, pitch: 0.0, roll: 0.0 };
        let state = TemporalState::from_packet(packet, 1_000, None);
        assert!(build(&state, None).is_err());
    }

    #[test]
    fn stale_state_fails_the_gate() {
        let state = TemporalState::from_packet(base_packet(), 10_000, None);
        assert!(build(&state, None).is_err());
    }

    #[test]
    fn water_danger_or_submerged_sets_water_detected() {
        let mut packet = base_packet();
        packet.water = WaterSensor::new(70.0, None).unwrap();
        let state = TemporalState::from_packet(packet, 1_000, None);
        assert!(build(&state, None).unwrap().water_detected);
    }
}
