//! Route geography: waypoints and destinations loaded by the route navigator.

use serde::{Deserialize, Serialize};

use crate::error::ContractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointKind {
    Start,
    Intermediate,
    Destination,
}

/// A named geographic point in an ordered route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    #[serde(rename = "latitude")]
    pub lat: f64,
    #[serde(rename = "longitude")]
    pub lon: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub instruction: Option<String>,
    #[serde(rename = "type")]
    pub kind: WaypointKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Walking,
    Cycling,
    Transit,
    Driving,
}

/// An ordered list of ≥2 waypoints with an optional distance/time estimate.
/// Immutable after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    #[serde(rename = "transportMode")]
    pub transport_mode: TransportMode,
    #[serde(rename = "totalDistanceMeters", skip_serializing_if = "Option::is_none", default)]
    pub total_distance_meters: Option<f64>,
    #[serde(rename = "estimatedTimeSeconds", skip_serializing_if = "Option::is_none", default)]
    pub estimated_time_seconds: Option<i64>,
    pub waypoints: Vec<Waypoint>,
}

impl Destination {
    /// Validate the minimum-two-waypoints and non-empty-name invariants;
    /// defaults the first/last waypoint kinds when the source JSON omitted
    /// `type` — first implicitly start, last implicitly destination.
    pub fn validated(mut self) -> Result<Self, ContractError> {
        if self.name.trim().is_empty() {
            return Err(ContractError::EmptyDestinationName);
        }
        if self.waypoints.len() < 2 {
            return Err(ContractError::TooFewWaypoints {
                count: self.waypoints.len(),
            });
        }
        if let Some(first) = self.waypoints.first_mut() {
            first.kind = WaypointKind::Start;
        }
        let last_idx = self.waypoints.len() - 1;
        self.waypoints[last_idx].kind = WaypointKind::Destination;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wp(lat: f64, lon: f64, kind: WaypointKind) -> Waypoint {
        Waypoint {
            lat,
            lon,
            name: None,
            instruction: None,
            kind,
        }
    }

    #[test]
    fn rejects_single_waypoint() {
        let dest = Destination {
            name: "Home".into(),
            transport_mode: TransportMode::Walking,
            total_distance_meters: None,
            estimated_time_seconds: None,
            waypoints: vec![wp(1.0, 1.0, WaypointKind::Start)],
        };
        assert!(dest.validated().is_err());
    }

    #[test]
    fn rejects_empty_name() {
        let dest = Destination {
            name: "  ".into(),
            transport_mode: TransportMode::Walking,
            total_distance_meters: None,
            estimated_time_seconds: None,
            waypoints: vec![
                wp(1.0, 1.0, WaypointKind::Start),
                wp(2.0, 2.0, WaypointKind::Destination),
            ],
        };
        assert!(dest.validated().is_err());
    }

    #[test]
    fn defaults_endpoint_kinds() {
        let dest = Destination {
            name: "Library".into(),
            transport_mode: TransportMode::Walking,
            total_distance_meters: None,
            estimated_time_seconds: None,
            waypoints: vec![
                wp(1.0, 1.0, WaypointKind::Intermediate),
                wp(2.0, 2.0, WaypointKind::Intermediate),
                wp(3.0, 3.0, WaypointKind::Intermediate),
            ],
        }
        .validated()
        .unwrap();
        assert_eq!(dest.waypoints[0].kind, WaypointKind::Start);
        assert_eq!(dest.waypoints[2].kind, WaypointKind::Destination);
    }
}
