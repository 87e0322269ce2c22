//! GPS route navigator: waypoint sequencing, bearing/distance computation,
//! waypoint- and destination-reached events.
//!
//! Updated in parallel with the rest of the pipeline from the GPS field of
//! every packet; the waypoint index is owned exclusively by this type.

use cane_contracts::{ContractError, Destination, GpsFix, Waypoint};

/// Earth radius used for the haversine/initial-bearing formulas, meters
/// (WGS-84 mean sphere radius).
const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub const DEFAULT_REACHED_THRESHOLD_M: f64 = 10.0;

/// Great-circle distance between two lat/lon points, meters.
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_M * c
}

/// Initial great-circle bearing from point 1 to point 2, normalized to
/// `[0, 360)` degrees.
pub fn initial_bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_lambda = (lon2 - lon1).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();
    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// A waypoint- or destination-reached event emitted by `update_position`.
#[derive(Debug, Clone, PartialEq)]
pub enum NavEvent {
    WaypointReached(Waypoint),
    DestinationReached,
}

/// Tracks progress along a loaded destination's waypoint list.
#[derive(Debug, Clone, Default)]
pub struct RouteNavigator {
    destination: Option<Destination>,
    current_index: usize,
    current_position: Option<(f64, f64)>,
    reached_threshold_m: f64,
    total_route_length_m: f64,
    completed: bool,
}

impl RouteNavigator {
    pub fn new() -> Self {
        Self {
            reached_threshold_m: DEFAULT_REACHED_THRESHOLD_M,
            ..Default::default()
        }
    }

    pub fn with_reached_threshold(mut self, meters: f64) -> Self {
        self.reached_threshold_m = meters;
        self
    }

    /// Validates (≥2 waypoints, non-empty name) and resets the index to 0.
    pub fn load_destination(&mut self, destination: Destination) -> Result<(), ContractError> {
        let destination = destination.validated()?;
        self.total_route_length_m = Self::route_length(&destination.waypoints);
        self.destination = Some(destination);
        self.current_index = 0;
        self.completed = false;
        Ok(())
    }

    pub fn clear_destination(&mut self) {
        self.destination = None;
        self.current_index = 0;
        self.total_route_length_m = 0.0;
        self.completed = false;
    }

    pub fn has_active_destination(&self) -> bool {
        self.destination.is_some() && !self.completed
    }

    pub fn destination(&self) -> Option<&Destination> {
        self.destination.as_ref()
    }

    pub fn current_waypoint(&self) -> Option<&Waypoint> {
        self.destination.as_ref()?.waypoints.get(self.current_index)
    }

    fn route_length(waypoints: &[Waypoint]) -> f64 {
        waypoints
            .windows(2)
            .map(|pair| haversine_distance_m(pair[0].lat, pair[0].lon, pair[1].lat, pair[1].lon))
            .sum()
    }

    /// Advances the waypoint index against a fresh GPS fix. Returns any
    /// waypoint/destination-reached events triggered by this update — at
    /// most one `WaypointReached` followed by an optional `DestinationReached`
    /// when the reached waypoint was the last one.
    pub fn update_position(&mut self, gps: &GpsFix) -> Vec<NavEvent> {
        let mut events = Vec::new();

        if !self.has_active_destination() || !gps.valid() {
            return events;
        }
        let (lat, lon) = match (gps.lat, gps.lon) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return events,
        };
        self.current_position = Some((lat, lon));

        loop {
            let waypoint = match self.current_waypoint() {
                Some(w) => w.clone(),
                None => break,
            };
            let distance = haversine_distance_m(lat, lon, waypoint.lat, waypoint.lon);
            if distance > self.reached_threshold_m {
                break;
            }

            events.push(NavEvent::WaypointReached(waypoint));
            self.current_index += 1;

            let waypoint_count = self.destination.as_ref().map(|d| d.waypoints.len()).unwrap_or(0);
            if self.current_index >= waypoint_count {
                self.completed = true;
                events.push(NavEvent::DestinationReached);
                break;
            }
        }

        events
    }

    /// Initial great-circle bearing from the current position to the
    /// current waypoint, `[0, 360)`. `None` without a position fix.
    pub fn target_bearing(&self) -> Option<f64> {
        let (lat, lon) = self.current_position?;
        let waypoint = self.current_waypoint()?;
        Some(initial_bearing_deg(lat, lon, waypoint.lat, waypoint.lon))
    }

    pub fn distance_to_current_waypoint(&self) -> Option<f64> {
        let (lat, lon) = self.current_position?;
        let waypoint = self.current_waypoint()?;
        Some(haversine_distance_m(lat, lon, waypoint.lat, waypoint.lon))
    }

    /// Distance from the current position to the current waypoint, plus
    /// every remaining inter-waypoint segment to the end of the route.
    pub fn distance_to_destination(&self) -> Option<f64> {
        let to_current = self.distance_to_current_waypoint()?;
        let remaining = self.destination.as_ref()?.waypoints[self.current_index..]
            .windows(2)
            .map(|pair| haversine_distance_m(pair[0].lat, pair[0].lon, pair[1].lat, pair[1].lon))
            .sum::<f64>();
        Some(to_current + remaining)
    }

    /// Fraction of the route covered, `[0, 1]`. `0` until a position fix
    /// arrives; `1` once the destination is reached.
    pub fn progress(&self) -> f64 {
        if self.completed {
            return 1.0;
        }
        if self.total_route_length_m <= 0.0 {
            return 0.0;
        }
        match self.distance_to_destination() {
            Some(remaining) => (1.0 - remaining / self.total_route_length_m).clamp(0.0, 1.0),
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cane_contracts::{FixKind, WaypointKind};

    fn wp(lat: f64, lon: f64, kind: WaypointKind) -> Waypoint {
        Waypoint {
            lat,
            lon,
            name: None,
            instruction: None,
            kind,
        }
    }

    fn fix(lat: f64, lon: f64) -> GpsFix {
        GpsFix {
            lat: Some(lat),
            lon: Some(lon),
            fix_kind: FixKind::ThreeD,
            ..GpsFix::default()
        }
    }

    fn destination() -> Destination {
        Destination {
            name: "Library".into(),
            transport_mode: cane_contracts::TransportMode::Walking,
            total_distance_meters: None,
            estimated_time_seconds: None,
            waypoints: vec![
                wp(0.0, 0.0, WaypointKind::Start),
                wp(0.0, 0.001, WaypointKind::Intermediate),
                wp(0.0, 0.002, WaypointKind::Destination),
            ],
        }
    }

    #[test]
    fn haversine_is_symmetric_and_zero_at_identity() {
        let a = (48.8566, 2.3522);
        let b = (51.5074, -0.1278);
        assert!((haversine_distance_m(a.0, a.1, b.0, b.1) - haversine_distance_m(b.0, b.1, a.0, a.1)).abs() < 1e-6);
        assert_eq!(haversine_distance_m(a.0, a.1, a.0, a.1), 0.0);
    }

    #[test]
    fn waypoint_sequencing_advances_on_arrival() {
        let mut nav = RouteNavigator::new();
        nav.load_destination(destination()).unwrap();
        assert_eq!(nav.current_index, 0);

        let events = nav.update_position(&fix(0.0, 0.0));
        assert_eq!(events, vec![NavEvent::WaypointReached(wp(0.0, 0.0, WaypointKind::Start))]);
        assert_eq!(nav.current_index, 1);
    }

    #[test]
    fn reaching_the_last_waypoint_completes_the_destination() {
        let mut nav = RouteNavigator::new();
        nav.load_destination(destination()).unwrap();
        nav.update_position(&fix(0.0, 0.0));
        nav.update_position(&fix(0.0, 0.001));
        let events = nav.update_position(&fix(0.0, 0.002));
        assert!(events.contains(&NavEvent::DestinationReached));
        assert!(!nav.has_active_destination());
        assert_eq!(nav.progress(), 1.0);
    }

    #[test]
    fn invalid_fix_is_ignored() {
        let mut nav = RouteNavigator::new();
        nav.load_destination(destination()).unwrap();
        let events = nav.update_position(&GpsFix::default());
        assert!(events.is_empty());
        assert_eq!(nav.current_index, 0);
    }

    #[test]
    fn load_destination_rejects_single_waypoint() {
        let mut nav = RouteNavigator::new();
        let bad = Destination {
            name: "X".into(),
            transport_mode: cane_contracts::TransportMode::Walking,
            total_distance_meters: None,
            estimated_time_seconds: None,
            waypoints: vec![wp(0.0, 0.0, WaypointKind::Start)],
        };
        assert!(nav.load_destination(bad).is_err());
    }
}
