//! # cane-core
//!
//! The perception → decision → guidance pipeline for the assistive cane:
//! filters raw sensor packets, derives temporal state, tracks the active
//! GPS route, builds a `Snapshot` of the cane's situation, runs it through
//! the expert rule engine, and drives a `SpeechSynthesizer` through the
//! guidance executor.

pub mod engine;
pub mod error;
pub mod executor;
pub mod filter;
pub mod navigator;
pub mod pipeline;
pub mod rules;
pub mod snapshot;
pub mod state;

pub use engine::ExpertEngine;
pub use error::GuidanceError;
pub use executor::{DisplacementTracker, ExecutorState, GuidanceExecutor};
pub use filter::SensorFilter;
pub use navigator::{NavEvent, RouteNavigator};
pub use pipeline::{Pipeline, PipelineConfig, PipelineEvent, PipelineHandle, PipelineSnapshot, PipelineStats};
pub use rules::{Rule, RuleContext};
pub use snapshot::Snapshot;
pub use state::TemporalState;
