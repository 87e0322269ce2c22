//! Scripted packet sequences: one function per named scenario, each
//! returning a timestamped `Packet` sequence that exercises a specific
//! rule in the expert engine.
//!
//! Grounded on the teacher's `scenarios::ScenarioType` enum — a named
//! fault/behavior mode plus its parameters — generalized here to name a
//! guidance situation instead of a regatta fault, and to emit packets
//! directly rather than perturbing a physics simulation (this demo is a
//! scripted sequence generator, not a physics simulator; see DESIGN.md).

use cane_contracts::{Destination, FixKind, GpsFix, Imu, ObstaclePair, Packet, TransportMode, WaterSensor, Waypoint, WaypointKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioKind {
    /// Nothing in the way, no destination — should only ever say "clear, continue".
    ClearPath,
    /// An obstacle in front closing in over several ticks.
    ApproachingObstacle,
    /// The fixed head-height sensor trips.
    HeadHeightObstacle,
    /// The ground-water sensor trips.
    Water,
    /// A destination is loaded and GPS fixes walk the route to completion.
    GpsGuidedWalk,
    /// A destination is loaded, then GPS fixes stop arriving.
    GpsLoss,
}

const TICK_MS: i64 = 200;

fn packet(t: i64, yaw: f64, upper: Option<f64>, lower: Option<f64>, humidity: f64, gps: GpsFix) -> Packet {
    Packet {
        timestamp_ms: t,
        imu: Imu::new(yaw, 0.0, 0.0).expect("scripted yaw is in range"),
        obstacles: ObstaclePair::new(upper, lower, 0.0).expect("scripted obstacle distances are in range"),
        water: WaterSensor::new(humidity, None).expect("scripted humidity is in range"),
        gps,
    }
}

fn no_fix() -> GpsFix {
    GpsFix {
        fix_kind: FixKind::None,
        ..GpsFix::default()
    }
}

fn fix(lat: f64, lon: f64, heading: f64) -> GpsFix {
    GpsFix {
        lat: Some(lat),
        lon: Some(lon),
        heading: Some(heading),
        satellites: Some(9),
        hdop: Some(1.2),
        fix_kind: FixKind::ThreeD,
        ..GpsFix::default()
    }
}

/// Produces the packet sequence for `kind`, starting at `start_ms`.
pub fn generate(kind: ScenarioKind, start_ms: i64) -> Vec<Packet> {
    match kind {
        ScenarioKind::ClearPath => (0..10)
            .map(|i| packet(start_ms + i * TICK_MS, 0.0, Some(4.0), Some(4.0), 5.0, no_fix()))
            .collect(),

        ScenarioKind::ApproachingObstacle => {
            // front distance steps down from 3.0m to 0.4m across 10 ticks.
            (0..10)
                .map(|i| {
                    let distance = (3.0 - i as f64 * 0.3).max(0.3);
                    packet(start_ms + i * TICK_MS, 0.0, Some(distance + 1.0), Some(distance), 5.0, no_fix())
                })
                .collect()
        }

        ScenarioKind::HeadHeightObstacle => (0..6)
            .map(|i| packet(start_ms + i * TICK_MS, 0.0, Some(0.5), Some(3.0), 5.0, no_fix()))
            .collect(),

        ScenarioKind::Water => (0..6)
            .map(|i| packet(start_ms + i * TICK_MS, 0.0, Some(4.0), Some(4.0), 70.0, no_fix()))
            .collect(),

        ScenarioKind::GpsGuidedWalk => {
            let waypoints = demo_route().waypoints;
            let mut packets = Vec::new();
            for (i, wp) in waypoints.iter().enumerate() {
                let t = start_ms + i as i64 * 10 * TICK_MS;
                packets.push(packet(t, 0.0, Some(4.0), Some(4.0), 5.0, fix(wp.lat, wp.lon, 0.0)));
            }
            packets
        }

        ScenarioKind::GpsLoss => {
            let mut packets = vec![packet(start_ms, 0.0, Some(4.0), Some(4.0), 5.0, fix(0.0, 0.0, 0.0))];
            packets.extend((1..8).map(|i| packet(start_ms + i * TICK_MS, 0.0, Some(4.0), Some(4.0), 5.0, no_fix())));
            packets
        }
    }
}

/// The destination loaded before `GpsGuidedWalk`/`GpsLoss` packets are fed
/// through the pipeline.
pub fn demo_route() -> Destination {
    Destination {
        name: "Community Garden".to_string(),
        transport_mode: TransportMode::Walking,
        total_distance_meters: None,
        estimated_time_seconds: None,
        waypoints: vec![
            Waypoint { lat: 40.730_00, lon: -73.935_00, name: Some("Start".into()), instruction: None, kind: WaypointKind::Start },
            Waypoint { lat: 40.730_05, lon: -73.935_00, name: Some("Crosswalk".into()), instruction: Some("cross here".into()), kind: WaypointKind::Intermediate },
            Waypoint { lat: 40.730_10, lon: -73.935_00, name: Some("Community Garden".into()), instruction: None, kind: WaypointKind::Destination },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_scenario_produces_valid_packets() {
        for kind in [
            ScenarioKind::ClearPath,
            ScenarioKind::ApproachingObstacle,
            ScenarioKind::HeadHeightObstacle,
            ScenarioKind::Water,
            ScenarioKind::GpsGuidedWalk,
            ScenarioKind::GpsLoss,
        ] {
            let packets = generate(kind, 1_000_000);
            assert!(!packets.is_empty());
        }
    }

    #[test]
    fn approaching_obstacle_closes_in_monotonically() {
        let packets = generate(ScenarioKind::ApproachingObstacle, 0);
        let distances: Vec<f64> = packets.iter().map(|p| p.obstacles.lower.unwrap()).collect();
        for pair in distances.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
    }

    #[test]
    fn demo_route_has_at_least_two_waypoints() {
        assert!(demo_route().waypoints.len() >= 2);
    }
}
