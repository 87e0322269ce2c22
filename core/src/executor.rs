//! Guidance executor: serializes instructions to the speech collaborator,
//! tracks displacement toward a spoken distance, and emits follow-up
//! actions once the target is covered.
//!
//! Grounded on the teacher's `auto_director::start_auto_director` shape —
//! periodic tick plus shared mutable state — generalized from a ranking
//! loop into a small state machine. `update_displacement` is driven by the
//! caller once per `PipelineEvent::State` rather than its own timer: the
//! pipeline already ticks once per incoming packet, so a second interval
//! alongside it would just be two clocks racing for the same cadence.

use std::sync::Arc;
use std::time::Instant;

use cane_contracts::{FollowUpAction, Instruction, SpeechPriority, SpeechSynthesizer};

use crate::error::GuidanceError;
use crate::snapshot::Snapshot;
use crate::state::angle_delta;

pub const AVG_WALKING_SPEED_MPS: f64 = 1.4;
const PITCH_ATTENUATION: f64 = 0.8;
const PITCH_ATTENUATION_THRESHOLD_DEG: f64 = 10.0;
const YAW_COS_THRESHOLD_DEG: f64 = 15.0;
/// No displacement update for longer than this logs a non-fatal timeout
/// event.
pub const STUCK_TIMEOUT_S: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Idle,
    Speaking,
    Navigating,
    Alerting,
    Paused,
}

/// Estimates distance walked since an instruction was spoken, from IMU
/// pitch/yaw alone (no odometry on this hardware) — or from an externally
/// supplied distance, for a future odometry source.
pub struct DisplacementTracker {
    start_yaw: f64,
    start_time: Instant,
    last_update: Instant,
    target_m: f64,
    tracked_m: f64,
}

impl DisplacementTracker {
    pub fn start(start_snapshot: &Snapshot, target_m: f64) -> Self {
        let now = Instant::now();
        Self {
            start_yaw: start_snapshot.imu.yaw,
            start_time: now,
            last_update: now,
            target_m,
            tracked_m: 0.0,
        }
    }

    /// `avg_walking_speed × Δt × attenuation`, attenuated further by
    /// `cos(|Δyaw|)` once the user has turned more than 15°. Tracked
    /// distance only ever grows, even if a later sample's instantaneous
    /// estimate would be lower.
    pub fn estimate(&mut self, current: &Snapshot) -> f64 {
        let dt = self.start_time.elapsed().as_secs_f64();
        let attenuation = if current.imu.pitch.abs() > PITCH_ATTENUATION_THRESHOLD_DEG {
            PITCH_ATTENUATION
        } else {
            1.0
        };
        let yaw_delta = angle_delta(current.imu.yaw, self.start_yaw).abs();
        let mut distance = AVG_WALKING_SPEED_MPS * dt * attenuation;
        if yaw_delta > YAW_COS_THRESHOLD_DEG {
            distance *= yaw_delta.to_radians().cos();
        }
        self.tracked_m = self.tracked_m.max(distance.max(0.0));
        self.last_update = Instant::now();
        self.tracked_m
    }

    pub fn apply_external_distance(&mut self, distance_m: f64) -> f64 {
        self.tracked_m = self.tracked_m.max(distance_m.max(0.0));
        self.last_update = Instant::now();
        self.tracked_m
    }

    pub fn reached_target(&self) -> bool {
        self.tracked_m >= self.target_m
    }

    pub fn tracked_m(&self) -> f64 {
        self.tracked_m
    }

    pub fn seconds_since_last_update(&self) -> f64 {
        self.last_update.elapsed().as_secs_f64()
    }
}

/// Fixed utterance for a follow-up action.
fn follow_up_message(action: &FollowUpAction) -> String {
    match action {
        FollowUpAction::TurnLeft => "turn left now".to_string(),
        FollowUpAction::TurnRight => "turn right now".to_string(),
        FollowUpAction::Stop => "stop".to_string(),
        FollowUpAction::Continue => "continue straight".to_string(),
        FollowUpAction::Raw(s) => s.clone(),
    }
}

/// Instruction queue, state machine, and displacement tracker driving the
/// speech collaborator. Holds its speech synthesizer as a trait object —
/// a capability consumed only through the interface.
pub struct GuidanceExecutor {
    speech: Arc<dyn SpeechSynthesizer>,
    state: ExecutorState,
    current_instruction: Option<Instruction>,
    pending: Vec<Instruction>,
    tracker: Option<DisplacementTracker>,
}

impl GuidanceExecutor {
    pub fn new(speech: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            speech,
            state: ExecutorState::Idle,
            current_instruction: None,
            pending: Vec::new(),
            tracker: None,
        }
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn current_instruction(&self) -> Option<&Instruction> {
        self.current_instruction.as_ref()
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker.is_some()
    }

    /// Handles one instruction emitted by the expert engine.
    pub async fn process(&mut self, instruction: Instruction, snapshot_at_emission: &Snapshot) -> Result<(), GuidanceError> {
        if instruction.immediate {
            self.speech.interrupt();
            self.state = ExecutorState::Alerting;
            self.speech.speak(&instruction.message, SpeechPriority::Urgent).await?;
        } else {
            self.pending.push(instruction.clone());
            if self.state == ExecutorState::Speaking {
                self.speech.wait_for_completion().await;
            }
            self.state = ExecutorState::Speaking;
            self.speech.speak(&instruction.message, SpeechPriority::Normal).await?;
            self.pending.retain(|i| i != &instruction);
        }

        self.current_instruction = Some(instruction.clone());
        if instruction.requires_movement() {
            let target_m = instruction.distance_m.unwrap_or(0.0);
            self.tracker = Some(DisplacementTracker::start(snapshot_at_emission, target_m));
            self.state = ExecutorState::Navigating;
        } else {
            self.tracker = None;
            self.state = ExecutorState::Idle;
        }
        Ok(())
    }

    /// Feeds a fresh snapshot into the active displacement tracker, if
    /// any. Once the target distance is covered, speaks the instruction's
    /// follow-up action (if any) and returns to `Idle`.
    pub async fn update_displacement(&mut self, current_snapshot: &Snapshot) -> Result<(), GuidanceError> {
        let Some(tracker) = self.tracker.as_mut() else {
            return Ok(());
        };
        tracker.estimate(current_snapshot);
        if tracker.reached_target() {
            let follow_up = self.current_instruction.as_ref().and_then(|i| i.follow_up_action.clone());
            self.tracker = None;
            self.state = ExecutorState::Idle;
            if let Some(action) = follow_up {
                self.speech.speak(&follow_up_message(&action), SpeechPriority::Normal).await?;
            }
        }
        Ok(())
    }

    /// Accepts an externally supplied distance update (future odometry
    /// source) instead of the IMU-derived estimate.
    pub fn apply_external_distance(&mut self, distance_m: f64) {
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.apply_external_distance(distance_m);
        }
    }

    /// True when the active tracker has gone more than `STUCK_TIMEOUT_S`
    /// without an update — a non-fatal condition the caller should log.
    pub fn is_stuck(&self) -> bool {
        self.tracker.as_ref().is_some_and(|t| t.seconds_since_last_update() > STUCK_TIMEOUT_S)
    }

    pub async fn pause(&mut self) -> Result<(), GuidanceError> {
        self.speech.pause().await?;
        self.state = ExecutorState::Paused;
        Ok(())
    }

    pub async fn resume(&mut self) -> Result<(), GuidanceError> {
        self.speech.resume().await?;
        self.state = ExecutorState::Speaking;
        Ok(())
    }

    /// Cancels the current utterance, drops any active displacement
    /// tracking, and returns to `Idle`.
    pub async fn stop(&mut self) -> Result<(), GuidanceError> {
        self.speech.stop().await?;
        self.tracker = None;
        self.pending.clear();
        self.state = ExecutorState::Idle;
        Ok(())
    }
}
