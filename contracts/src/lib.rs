//! # cane-contracts
//!
//! Shared value types and capability traits for the assistive-cane
//! guidance system.
//!
//! These types are used by:
//! - `cane-core`: the perception → decision → guidance pipeline
//! - the cane firmware and BLE transport (out of scope — consumed only
//!   through the [`transport::BleTransport`] trait)
//! - the speech synthesizer (out of scope — consumed only through the
//!   [`speech::SpeechSynthesizer`] trait)
//! - `cane-sim`: the demo packet generator, which plays scripted packets
//!   through a fake `BleTransport`
//!
//! ## Units
//!
//! Distances are meters, angles are degrees unless noted, timestamps are
//! milliseconds since the Unix epoch.

pub mod destination;
pub mod error;
pub mod instruction;
pub mod sensor;
pub mod speech;
pub mod transport;

pub use destination::{Destination, TransportMode, Waypoint, WaypointKind};
pub use error::ContractError;
pub use instruction::{FollowUpAction, Instruction, InstructionKind};
pub use sensor::{
    FixKind, GpsFix, Imu, ObstaclePair, ObstacleZone, Packet, WaterSensor, CLEAR_M, FRESH_AGE_MS,
    LOWER_DANGER_M, MAX_VALID_AGE_MS, STALE_AGE_MS, UPPER_DANGER_M, WARNING_M, WATER_CRITICAL_PCT,
    WATER_DANGER_PCT, WATER_WARNING_PCT,
};
pub use speech::{SpeechError, SpeechPriority, SpeechSynthesizer};
pub use transport::{BleTransport, TransportError};
