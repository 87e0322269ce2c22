//! Immutable sensor value types and their derived scores/predicates.
//!
//! Every constructor validates its invariants and returns a
//! [`ContractError`] rather than panicking — malformed telemetry is
//! dropped by the caller, never a reason to abort the pipeline.

use serde::{Deserialize, Serialize};

use crate::error::ContractError;

// ── IMU ────────────────────────────────────────────────────────────────────

/// Three Euler angles in degrees, as reported by the cane's onboard IMU.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Imu {
    /// yaw ∈ [-180, 180]
    pub yaw: f64,
    /// pitch ∈ [-90, 90]
    pub pitch: f64,
    /// roll ∈ [-180, 180]
    pub roll: f64,
}

impl Imu {
    pub fn new(yaw: f64, pitch: f64, roll: f64) -> Result<Self, ContractError> {
        if !(-180.0..=180.0).contains(&yaw) {
            return Err(ContractError::OutOfRange {
                field: "yaw",
                value: yaw,
                expected: "[-180, 180]",
            });
        }
        if !(-90.0..=90.0).contains(&pitch) {
            return Err(ContractError::OutOfRange {
                field: "pitch",
                value: pitch,
                expected: "[-90, 90]",
            });
        }
        if !(-180.0..=180.0).contains(&roll) {
            return Err(ContractError::OutOfRange {
                field: "roll",
                value: roll,
                expected: "[-180, 180]",
            });
        }
        Ok(Self { yaw, pitch, roll })
    }

    /// √(pitch² + roll²)
    pub fn tilt_magnitude(&self) -> f64 {
        (self.pitch * self.pitch + self.roll * self.roll).sqrt()
    }

    /// |pitch| > 60 ∨ |roll| > 45 — the cane is being held at a hazardous angle.
    pub fn dangerous_tilt(&self) -> bool {
        self.pitch.abs() > 60.0 || self.roll.abs() > 45.0
    }

    pub fn is_nan(&self) -> bool {
        self.yaw.is_nan() || self.pitch.is_nan() || self.roll.is_nan()
    }
}

// ── Obstacle pair ─────────────────────────────────────────────────────────

/// Which horizontal sector the servo-mounted lower sensor is currently
/// sweeping. center: |angle| ≤ 30; left: angle < -30; right: angle > 30.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleZone {
    Center,
    Left,
    Right,
}

pub const UPPER_DANGER_M: f64 = 0.6;
pub const LOWER_DANGER_M: f64 = 0.4;
pub const WARNING_M: f64 = 1.0;
pub const CLEAR_M: f64 = 2.5;

/// Two nullable distances (fixed head-height sensor + ground-scanning
/// servo sensor) plus the servo's current sweep angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstaclePair {
    /// Fixed head-height sensor distance, meters ∈ (0, 10].
    pub upper: Option<f64>,
    /// Ground-scanning servo sensor distance, meters ∈ (0, 10].
    pub lower: Option<f64>,
    /// Servo sweep angle, degrees ∈ [-90, 90].
    #[serde(rename = "servoAngle")]
    pub servo_angle: f64,
}

fn validate_distance(field: &'static str, d: Option<f64>) -> Result<(), ContractError> {
    if let Some(v) = d {
        if !(v > 0.0 && v <= 10.0) {
            return Err(ContractError::OutOfRange {
                field,
                value: v,
                expected: "(0, 10]",
            });
        }
    }
    Ok(())
}

impl ObstaclePair {
    pub fn new(
        upper: Option<f64>,
        lower: Option<f64>,
        servo_angle: f64,
    ) -> Result<Self, ContractError> {
        validate_distance("upper", upper)?;
        validate_distance("lower", lower)?;
        if !(-90.0..=90.0).contains(&servo_angle) {
            return Err(ContractError::OutOfRange {
                field: "servo_angle",
                value: servo_angle,
                expected: "[-90, 90]",
            });
        }
        Ok(Self {
            upper,
            lower,
            servo_angle,
        })
    }

    pub fn zone(&self) -> ObstacleZone {
        if self.servo_angle < -30.0 {
            ObstacleZone::Left
        } else if self.servo_angle > 30.0 {
            ObstacleZone::Right
        } else {
            ObstacleZone::Center
        }
    }

    /// Linear proximity contribution of one sensor reading: 1.0 at or
    /// inside `danger`, 0.0 at or beyond `clear`, linearly interpolated
    /// between them.
    fn proximity(distance: Option<f64>, danger: f64, clear: f64) -> f64 {
        match distance {
            None => 0.0,
            Some(d) if d <= danger => 1.0,
            Some(d) if d >= clear => 0.0,
            Some(d) => (clear - d) / (clear - danger),
        }
    }

    /// Blended danger score ∈ [0, 1]: upper sensor weighted ×1.5, lower
    /// weighted ×1.0, plus a +0.3 bonus when the lower sensor is sweeping
    /// forward (center zone) and reading under 1 m.
    pub fn danger_score(&self) -> f64 {
        let upper_s = Self::proximity(self.upper, UPPER_DANGER_M, CLEAR_M);
        let lower_s = Self::proximity(self.lower, LOWER_DANGER_M, CLEAR_M);
        let blended = (upper_s * 1.5 + lower_s * 1.0) / 2.5;

        let forward_bonus = if self.zone() == ObstacleZone::Center {
            match self.lower {
                Some(d) if d < 1.0 => 0.3,
                _ => 0.0,
            }
        } else {
            0.0
        };

        (blended + forward_bonus).clamp(0.0, 1.0)
    }
}

// ── Water sensor ───────────────────────────────────────────────────────────

pub const WATER_WARNING_PCT: f64 = 30.0;
pub const WATER_DANGER_PCT: f64 = 60.0;
pub const WATER_CRITICAL_PCT: f64 = 85.0;

/// Ground-water humidity sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterSensor {
    /// humidity ∈ [0, 100] percent
    #[serde(rename = "humidityLevel")]
    pub humidity: f64,
    /// raw ADC reading ∈ [0, 4095], when available
    #[serde(rename = "rawValue")]
    pub raw: Option<u16>,
}

impl WaterSensor {
    pub fn new(humidity: f64, raw: Option<u16>) -> Result<Self, ContractError> {
        if !(0.0..=100.0).contains(&humidity) {
            return Err(ContractError::OutOfRange {
                field: "humidity",
                value: humidity,
                expected: "[0, 100]",
            });
        }
        if let Some(r) = raw {
            if r > 4095 {
                return Err(ContractError::OutOfRange {
                    field: "raw",
                    value: r as f64,
                    expected: "[0, 4095]",
                });
            }
        }
        Ok(Self { humidity, raw })
    }

    pub fn is_warning(&self) -> bool {
        self.humidity >= WATER_WARNING_PCT
    }

    pub fn is_danger(&self) -> bool {
        self.humidity >= WATER_DANGER_PCT
    }

    pub fn is_critical(&self) -> bool {
        self.humidity >= WATER_CRITICAL_PCT
    }

    /// The ground sensor is treated as fully submerged at the critical
    /// threshold — there is no separate saturation signal on the wire.
    pub fn submerged(&self) -> bool {
        self.is_critical()
    }
}

// ── GPS fix ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixKind {
    #[default]
    None,
    #[serde(rename = "2d")]
    TwoD,
    #[serde(rename = "3d")]
    ThreeD,
    Dgps,
}

/// One GPS fix. Every field but `fix_kind` may be absent (no satellite
/// lock yet, or the field simply wasn't populated by the firmware).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GpsFix {
    #[serde(rename = "latitude")]
    pub lat: Option<f64>,
    #[serde(rename = "longitude")]
    pub lon: Option<f64>,
    pub altitude: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    #[serde(rename = "satellitesCount")]
    pub satellites: Option<u32>,
    pub hdop: Option<f64>,
    /// Timestamp the GPS module itself attached to the fix, if it reports
    /// one — distinct from the packet's own `timestamp_ms`.
    #[serde(rename = "gpsTimestamp", skip_serializing_if = "Option::is_none", default)]
    pub gps_timestamp_ms: Option<i64>,
    #[serde(rename = "fixType")]
    pub fix_kind: FixKind,
}

impl GpsFix {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lat: Option<f64>,
        lon: Option<f64>,
        altitude: Option<f64>,
        speed: Option<f64>,
        heading: Option<f64>,
        satellites: Option<u32>,
        hdop: Option<f64>,
        gps_timestamp_ms: Option<i64>,
        fix_kind: FixKind,
    ) -> Result<Self, ContractError> {
        if let Some(v) = lat {
            if !(-90.0..=90.0).contains(&v) {
                return Err(ContractError::OutOfRange {
                    field: "lat",
                    value: v,
                    expected: "[-90, 90]",
                });
            }
        }
        if let Some(v) = lon {
            if !(-180.0..=180.0).contains(&v) {
                return Err(ContractError::OutOfRange {
                    field: "lon",
                    value: v,
                    expected: "[-180, 180]",
                });
            }
        }
        if let Some(v) = altitude {
            if v > 9000.0 {
                return Err(ContractError::OutOfRange {
                    field: "altitude",
                    value: v,
                    expected: "<= 9000",
                });
            }
        }
        if let Some(v) = speed {
            if !(0.0..=300.0).contains(&v) {
                return Err(ContractError::OutOfRange {
                    field: "speed",
                    value: v,
                    expected: "[0, 300]",
                });
            }
        }
        if let Some(v) = heading {
            if !(0.0..360.0).contains(&v) {
                return Err(ContractError::OutOfRange {
                    field: "heading",
                    value: v,
                    expected: "[0, 360)",
                });
            }
        }
        if let Some(v) = hdop {
            if v < 0.0 {
                return Err(ContractError::OutOfRange {
                    field: "hdop",
                    value: v,
                    expected: ">= 0",
                });
            }
        }
        Ok(Self {
            lat,
            lon,
            altitude,
            speed,
            heading,
            satellites,
            hdop,
            gps_timestamp_ms,
            fix_kind,
        })
    }

    /// fix_kind ≠ none ∧ lat, lon present.
    pub fn valid(&self) -> bool {
        self.fix_kind != FixKind::None && self.lat.is_some() && self.lon.is_some()
    }

    /// valid ∧ satellites ≥ 6 ∧ hdop < 5.
    pub fn good_quality(&self) -> bool {
        self.valid() && self.satellites.unwrap_or(0) >= 6 && self.hdop.unwrap_or(f64::MAX) < 5.0
    }
}

// ── Packet ─────────────────────────────────────────────────────────────────

/// Fresh below this age; see [`Packet::fresh`].
pub const FRESH_AGE_MS: i64 = 1_000;
/// Stale above this age; see [`Packet::stale`].
pub const STALE_AGE_MS: i64 = 2_000;
/// Maximum age accepted by pipeline validation.
pub const MAX_VALID_AGE_MS: i64 = 5_000;
const MAX_PAST_SKEW_MS: i64 = 3_600_000;
const MAX_FUTURE_SKEW_MS: i64 = 5_000;

/// One synchronized sensor reading, bundling IMU, obstacle, water and GPS
/// data under a single timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
    pub imu: Imu,
    pub obstacles: ObstaclePair,
    #[serde(rename = "waterSensor")]
    pub water: WaterSensor,
    pub gps: GpsFix,
}

impl Packet {
    pub fn new(
        timestamp_ms: i64,
        imu: Imu,
        obstacles: ObstaclePair,
        water: WaterSensor,
        gps: GpsFix,
        now_ms: i64,
    ) -> Result<Self, ContractError> {
        if timestamp_ms < now_ms - MAX_PAST_SKEW_MS || timestamp_ms > now_ms + MAX_FUTURE_SKEW_MS {
            return Err(ContractError::TimestampOutOfWindow {
                timestamp_ms,
                now_ms,
            });
        }
        Ok(Self {
            timestamp_ms,
            imu,
            obstacles,
            water,
            gps,
        })
    }

    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.timestamp_ms
    }

    pub fn fresh(&self, now_ms: i64) -> bool {
        self.age_ms(now_ms) < FRESH_AGE_MS
    }

    pub fn stale(&self, now_ms: i64) -> bool {
        self.age_ms(now_ms) > STALE_AGE_MS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilt_magnitude_pythagorean() {
        let imu = Imu::new(0.0, 3.0, 4.0).unwrap();
        assert!((imu.tilt_magnitude() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn dangerous_tilt_thresholds() {
        assert!(Imu::new(0.0, 61.0, 0.0).unwrap().dangerous_tilt());
        assert!(Imu::new(0.0, 0.0, 46.0).unwrap().dangerous_tilt());
        assert!(!Imu::new(0.0, 59.0, 44.0).unwrap().dangerous_tilt());
    }

    #[test]
    fn imu_rejects_out_of_range_yaw() {
        assert!(Imu::new(181.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn obstacle_zone_boundaries() {
        let center = ObstaclePair::new(None, Some(1.0), 30.0).unwrap();
        assert_eq!(center.zone(), ObstacleZone::Center);
        let right = ObstaclePair::new(None, Some(1.0), 30.1).unwrap();
        assert_eq!(right.zone(), ObstacleZone::Right);
        let left = ObstaclePair::new(None, Some(1.0), -30.1).unwrap();
        assert_eq!(left.zone(), ObstacleZone::Left);
    }

    #[test]
    fn danger_score_saturates_at_close_range() {
        let pair = ObstaclePair::new(Some(0.2), Some(0.1), 0.0).unwrap();
        assert!((pair.danger_score() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn danger_score_zero_when_clear() {
        let pair = ObstaclePair::new(Some(3.0), Some(3.0), 0.0).unwrap();
        assert_eq!(pair.danger_score(), 0.0);
    }

    #[test]
    fn water_thresholds() {
        let w = WaterSensor::new(70.0, None).unwrap();
        assert!(w.is_warning());
        assert!(w.is_danger());
        assert!(!w.is_critical());
        assert!(!w.submerged());
    }

    #[test]
    fn gps_validity() {
        let fix = GpsFix::new(
            Some(1.0),
            Some(2.0),
            None,
            None,
            None,
            Some(8),
            Some(1.0),
            None,
            FixKind::ThreeD,
        )
        .unwrap();
        assert!(fix.valid());
        assert!(fix.good_quality());

        let no_lock = GpsFix::default();
        assert!(!no_lock.valid());
        assert!(!no_lock.good_quality());
    }

    #[test]
    fn packet_freshness() {
        let packet = Packet::new(
            1_000,
            Imu::new(0.0, 0.0, 0.0).unwrap(),
            ObstaclePair::new(None, None, 0.0).unwrap(),
            WaterSensor::new(0.0, None).unwrap(),
            GpsFix::default(),
            1_000,
        )
        .unwrap();
        assert!(packet.fresh(1_500));
        assert!(!packet.stale(1_500));
        assert!(packet.stale(3_200));
    }

    #[test]
    fn packet_rejects_timestamp_far_in_future() {
        let err = Packet::new(
            20_000,
            Imu::new(0.0, 0.0, 0.0).unwrap(),
            ObstaclePair::new(None, None, 0.0).unwrap(),
            WaterSensor::new(0.0, None).unwrap(),
            GpsFix::default(),
            1_000,
        );
        assert!(err.is_err());
    }

    #[test]
    fn packet_wire_json_uses_the_documented_field_names() {
        let packet = Packet::new(
            1_700_000_000_123,
            Imu::new(1.0, 2.0, 3.0).unwrap(),
            ObstaclePair::new(Some(1.2), Some(0.5), -45.0).unwrap(),
            WaterSensor::new(12.0, Some(400)).unwrap(),
            GpsFix::new(
                Some(40.0),
                Some(-74.0),
                None,
                None,
                None,
                Some(7),
                Some(1.5),
                Some(1_700_000_000_000),
                FixKind::ThreeD,
            )
            .unwrap(),
            1_700_000_000_123,
        )
        .unwrap();

        let json = serde_json::to_string(&packet).unwrap();
        assert!(json.contains("\"timestamp\":1700000000123"));
        assert!(json.contains("\"servoAngle\":-45.0"));
        assert!(json.contains("\"humidityLevel\":12.0"));
        assert!(json.contains("\"rawValue\":400"));
        assert!(json.contains("\"waterSensor\""));
        assert!(json.contains("\"satellitesCount\":7"));
        assert!(json.contains("\"fixType\":\"3d\""));
        assert!(json.contains("\"gpsTimestamp\":1700000000000"));

        let round_tripped: Packet = serde_json::from_str(&json).unwrap();
        assert_eq!(round_tripped, packet);
    }
}
