//! Sliding-window moving-average filter with anomaly rejection.
//!
//! The filter's only mutable state is five fixed-capacity windows: one per
//! IMU axis (yaw, pitch, roll) and one per obstacle direction (upper,
//! lower). Distances are filtered independently per direction; IMU axes are
//! filtered independently per axis. Water and GPS readings pass through
//! unfiltered — only IMU orientation and obstacle ranging need smoothing,
//! the two noisiest sensors on the cane.

use std::collections::VecDeque;

use cane_contracts::{ContractError, Imu, ObstaclePair, Packet};

pub const MIN_WINDOW: usize = 2;
pub const MAX_WINDOW: usize = 20;
pub const DEFAULT_WINDOW: usize = 5;

/// Obstacle samples more than this far from the last valid reading are
/// rejected outright — physically impossible at walking speed and almost
/// always an ultrasonic glitch.
const ANOMALY_THRESHOLD_M: f64 = 1.5;

#[derive(Debug, Clone)]
struct AxisWindow {
    capacity: usize,
    samples: VecDeque<f64>,
}

impl AxisWindow {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    fn push(&mut self, v: f64) {
        self.samples.push_back(v);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    fn mean(&self) -> f64 {
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    fn len(&self) -> usize {
        self.samples.len()
    }

    fn clear(&mut self) {
        self.samples.clear();
    }
}

#[derive(Debug, Clone)]
struct ObstacleWindow {
    capacity: usize,
    samples: VecDeque<Option<f64>>,
}

impl ObstacleWindow {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    fn last_present(&self) -> Option<f64> {
        self.samples.iter().rev().flatten().next().copied()
    }

    fn push_raw(&mut self, v: Option<f64>) {
        self.samples.push_back(v);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Mean over non-empty samples only; `None` if every sample so far is empty.
    fn mean(&self) -> Option<f64> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for s in self.samples.iter().flatten() {
            sum += s;
            count += 1;
        }
        (count > 0).then_some(sum / count as f64)
    }

    fn present_count(&self) -> usize {
        self.samples.iter().flatten().count()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }

    fn clear(&mut self) {
        self.samples.clear();
    }
}

fn filter_axis(window: &mut AxisWindow, raw: f64) -> f64 {
    window.push(raw);
    if window.len() < MIN_WINDOW {
        raw
    } else {
        window.mean()
    }
}

/// Applies the anomaly gate, then the warm-up passthrough, for one obstacle
/// direction. `None` samples are appended as-is (they contribute nothing to
/// the mean but still count toward the window rotating).
fn filter_obstacle(window: &mut ObstacleWindow, raw: Option<f64>) -> Option<f64> {
    match raw {
        None => window.push_raw(None),
        Some(v) => match window.last_present() {
            Some(last) if (v - last).abs() > ANOMALY_THRESHOLD_M => {
                return window.mean();
            }
            _ => window.push_raw(Some(v)),
        },
    }

    if window.present_count() < MIN_WINDOW {
        raw
    } else {
        window.mean()
    }
}

/// Moving-average filter over a packet stream. Holds no knowledge of the
/// packets themselves beyond their numeric axes — every call to `filter`
/// takes the filter's current window state into account and advances it.
#[derive(Debug, Clone)]
pub struct SensorFilter {
    capacity: usize,
    yaw: AxisWindow,
    pitch: AxisWindow,
    roll: AxisWindow,
    upper: ObstacleWindow,
    lower: ObstacleWindow,
}

impl SensorFilter {
    /// `window` is clamped into `[MIN_WINDOW, MAX_WINDOW]`.
    pub fn new(window: usize) -> Self {
        let capacity = window.clamp(MIN_WINDOW, MAX_WINDOW);
        Self {
            capacity,
            yaw: AxisWindow::new(capacity),
            pitch: AxisWindow::new(capacity),
            roll: AxisWindow::new(capacity),
            upper: ObstacleWindow::new(capacity),
            lower: ObstacleWindow::new(capacity),
        }
    }

    pub fn window_size(&self) -> usize {
        self.capacity
    }

    /// Pushes the packet's axes into their windows and returns a packet
    /// carrying the filtered values. Water and GPS are passed through
    /// unchanged.
    pub fn filter(&mut self, packet: &Packet) -> Result<Packet, ContractError> {
        let yaw = filter_axis(&mut self.yaw, packet.imu.yaw);
        let pitch = filter_axis(&mut self.pitch, packet.imu.pitch);
        let roll = filter_axis(&mut self.roll, packet.imu.roll);
        let imu = Imu::new(yaw, pitch, roll)?;

        let upper = filter_obstacle(&mut self.upper, packet.obstacles.upper);
        let lower = filter_obstacle(&mut self.lower, packet.obstacles.lower);
        let obstacles = ObstaclePair::new(upper, lower, packet.obstacles.servo_angle)?;

        Ok(Packet {
            timestamp_ms: packet.timestamp_ms,
            imu,
            obstacles,
            water: packet.water,
            gps: packet.gps,
        })
    }

    pub fn reset(&mut self) {
        self.yaw.clear();
        self.pitch.clear();
        self.roll.clear();
        self.upper.clear();
        self.lower.clear();
    }

    /// True once every window holds a full `window_size()` samples.
    pub fn is_warmed_up(&self) -> bool {
        self.yaw.len() >= self.capacity
            && self.pitch.len() >= self.capacity
            && self.roll.len() >= self.capacity
            && self.upper.len() >= self.capacity
            && self.lower.len() >= self.capacity
    }
}

impl Default for SensorFilter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cane_contracts::{FixKind, GpsFix, Imu, ObstaclePair, WaterSensor};

    fn packet_with(yaw: f64, pitch: f64, roll: f64, upper: Option<f64>, lower: Option<f64>) -> Packet {
        Packet {
            timestamp_ms: 0,
            imu: Imu::new(yaw, pitch, roll).unwrap(),
            obstacles: ObstaclePair::new(upper, lower, 0.0).unwrap(),
            water: WaterSensor::new(0.0, None).unwrap(),
            gps: GpsFix {
                fix_kind: FixKind::None,
                ..GpsFix::default()
            },
        }
    }

    #[test]
    fn idempotent_on_constant_input() {
        let mut filter = SensorFilter::new(5);
        let packet = packet_with(10.0, 5.0, -5.0, Some(1.0), Some(1.0));
        let mut last = packet;
        for _ in 0..8 {
            last = filter.filter(&packet).unwrap();
        }
        assert!((last.imu.yaw - 10.0).abs() < 1e-9);
        assert_eq!(last.obstacles.upper, Some(1.0));
        assert_eq!(last.obstacles.lower, Some(1.0));
    }

    #[test]
    fn anomaly_rejection_holds_the_line() {
        let mut filter = SensorFilter::new(5);
        let stable = packet_with(0.0, 0.0, 0.0, Some(1.0), None);
        let mut last = stable;
        for _ in 0..5 {
            last = filter.filter(&stable).unwrap();
        }
        assert!((last.obstacles.upper.unwrap() - 1.0).abs() < 1e-9);

        let spike = packet_with(0.0, 0.0, 0.0, Some(3.0), None);
        let after_spike = filter.filter(&spike).unwrap();
        assert!((after_spike.obstacles.upper.unwrap() - 1.0).abs() < 0.1);
    }

    #[test]
    fn warm_up_passes_raw_values_through() {
        let mut filter = SensorFilter::new(5);
        let packet = packet_with(20.0, 0.0, 0.0, Some(2.0), Some(2.0));
        let first = filter.filter(&packet).unwrap();
        assert_eq!(first.imu.yaw, 20.0);
        assert!(!filter.is_warmed_up());
    }

    #[test]
    fn reset_clears_windows() {
        let mut filter = SensorFilter::new(3);
        let packet = packet_with(1.0, 1.0, 1.0, Some(1.0), Some(1.0));
        for _ in 0..3 {
            filter.filter(&packet).unwrap();
        }
        assert!(filter.is_warmed_up());
        filter.reset();
        assert!(!filter.is_warmed_up());
    }

    #[test]
    fn null_obstacle_samples_contribute_nothing_to_the_mean() {
        let mut filter = SensorFilter::new(5);
        filter.filter(&packet_with(0.0, 0.0, 0.0, Some(1.0), None)).unwrap();
        filter.filter(&packet_with(0.0, 0.0, 0.0, None, None)).unwrap();
        let out = filter.filter(&packet_with(0.0, 0.0, 0.0, Some(1.0), None)).unwrap();
        assert!((out.obstacles.upper.unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(out.obstacles.lower, None);
    }
}
