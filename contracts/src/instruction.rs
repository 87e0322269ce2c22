//! Decision output: the single voice instruction produced per evaluation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstructionKind {
    Warning,
    Guidance,
    Correction,
}

/// What the guidance executor should do once the spoken distance has been
/// covered (tracked by the displacement tracker).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FollowUpAction {
    TurnLeft,
    TurnRight,
    Stop,
    Continue,
    Raw(String),
}

/// One voice-guidance directive, the sole output of the expert engine's
/// per-tick evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub kind: InstructionKind,
    pub message: String,
    pub distance_m: Option<f64>,
    pub follow_up_action: Option<FollowUpAction>,
    pub immediate: bool,
}

impl Instruction {
    pub fn new(kind: InstructionKind, message: impl Into<String>, immediate: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            distance_m: None,
            follow_up_action: None,
            immediate,
        }
    }

    pub fn with_distance(mut self, distance_m: f64) -> Self {
        self.distance_m = Some(distance_m);
        self
    }

    pub fn with_follow_up(mut self, action: FollowUpAction) -> Self {
        self.follow_up_action = Some(action);
        self
    }

    /// round(distance_m / 0.5) — one step per half meter.
    pub fn steps(&self) -> Option<u32> {
        self.distance_m.map(|d| (d / 0.5).round() as u32)
    }

    pub fn requires_movement(&self) -> bool {
        self.distance_m.map(|d| d > 0.0).unwrap_or(false)
    }

    fn word_count(&self) -> usize {
        self.message.split_whitespace().count()
    }

    /// round(word_count / 150 × 60,000) — 150 words-per-minute speech rate.
    pub fn estimated_speech_duration_ms(&self) -> u64 {
        ((self.word_count() as f64 / 150.0) * 60_000.0).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_rounds_to_nearest_half_meter() {
        let i = Instruction::new(InstructionKind::Guidance, "go", false).with_distance(1.0);
        assert_eq!(i.steps(), Some(2));
    }

    #[test]
    fn no_distance_means_no_movement() {
        let i = Instruction::new(InstructionKind::Warning, "stop now", false);
        assert!(!i.requires_movement());
        assert_eq!(i.steps(), None);
    }

    #[test]
    fn speech_duration_scales_with_word_count() {
        let i = Instruction::new(InstructionKind::Guidance, "turn left now please", false);
        // 4 words / 150 * 60000 = 1600ms
        assert_eq!(i.estimated_speech_duration_ms(), 1600);
    }
}
