//! Priority-ordered expert rule engine. Holds the default rule set in
//! descending-priority order and collapses one `Snapshot` into at most
//! one `Instruction`, applying the deduplication policy.

use cane_contracts::Instruction;

use crate::error::GuidanceError;
use crate::rules::{default_rules, Rule, RuleContext};
use crate::snapshot::Snapshot;

pub struct ExpertEngine {
    rules: Vec<Box<dyn Rule>>,
    last_instruction: Option<Instruction>,
    gps_lost: bool,
}

impl ExpertEngine {
    pub fn new() -> Self {
        Self::with_rules(default_rules())
    }

    /// Rules are evaluated in the order given — callers supplying a custom
    /// set are responsible for descending-priority order.
    pub fn with_rules(mut rules: Vec<Box<dyn Rule>>) -> Self {
        rules.sort_by_key(|r| std::cmp::Reverse(r.priority()));
        Self {
            rules,
            last_instruction: None,
            gps_lost: false,
        }
    }

    /// Set by the pipeline once three consecutive packets carry an invalid
    /// GPS fix while a destination is active; cleared on the next valid fix.
    pub fn set_gps_lost(&mut self, lost: bool) {
        self.gps_lost = lost;
    }

    pub fn last_instruction(&self) -> Option<&Instruction> {
        self.last_instruction.as_ref()
    }

    /// Evaluates the rule set against `snapshot`, returning `Some` only
    /// when the deduplication policy says this instruction is worth
    /// speaking: `last_instruction` is absent, the new instruction is
    /// `immediate`, or its `kind`/`message` differ from the last one.
    pub fn evaluate(&mut self, snapshot: &Snapshot) -> Result<Option<Instruction>, GuidanceError> {
        let ctx = RuleContext { gps_lost: self.gps_lost };

        let instruction = self
            .rules
            .iter_mut()
            .find(|rule| rule.matches(snapshot, &ctx))
            .map(|rule| rule.apply(snapshot, &ctx))
            .ok_or(GuidanceError::NoValidRule)?;

        let should_emit = match &self.last_instruction {
            None => true,
            Some(last) => instruction.immediate || last.kind != instruction.kind || last.message != instruction.message,
        };

        self.last_instruction = Some(instruction.clone());
        Ok(should_emit.then_some(instruction))
    }
}

impl Default for ExpertEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ImuSnapshot;

    fn snapshot(front: f64, left: f64, right: f64, obstacle_high: bool, water: bool, yaw: f64) -> Snapshot {
        Snapshot {
            front,
            left,
            right,
            obstacle_high,
            water_detected: water,
            imu: ImuSnapshot { yaw, pitch: 0.0, roll: 0.0 },
            timestamp_ms: 0,
            target_bearing: None,
            heading_deviation: None,
            distance_to_destination: None,
            destination_name: None,
            distance_to_next_waypoint: None,
            next_waypoint_name: None,
        }
    }

    #[test]
    fn clear_path_is_the_fallback() {
        let mut engine = ExpertEngine::new();
        let result = engine.evaluate(&snapshot(5.0, 5.0, 5.0, false, false, 0.0)).unwrap();
        assert!(result.is_some());
        assert_eq!(result.unwrap().message, "clear, continue");
    }

    #[test]
    fn high_priority_rule_wins_s1() {
        let mut engine = ExpertEngine::new();
        let instruction = engine.evaluate(&snapshot(0.7, 2.5, 1.0, false, false, 0.0)).unwrap().unwrap();
        assert_eq!(instruction.message, "obstacle ahead, turn left now");
    }

    #[test]
    fn high_obstacle_beats_everything_s3() {
        let mut engine = ExpertEngine::new();
        let instruction = engine.evaluate(&snapshot(3.0, 2.0, 2.0, true, false, 0.0)).unwrap().unwrap();
        assert_eq!(instruction.message, "head-height obstacle, stop");
    }

    #[test]
    fn water_rule_s4() {
        let mut engine = ExpertEngine::new();
        let instruction = engine.evaluate(&snapshot(4.0, 2.5, 2.5, false, true, 0.0)).unwrap().unwrap();
        assert_eq!(instruction.message, "water on ground, advance slowly");
    }

    #[test]
    fn neither_side_free_means_stop_s7() {
        let mut engine = ExpertEngine::new();
        let instruction = engine.evaluate(&snapshot(0.5, 0.4, 0.4, false, false, 0.0)).unwrap().unwrap();
        assert_eq!(instruction.message, "obstacle ahead, stop");
    }

    #[test]
    fn deduplicates_identical_non_immediate_instructions() {
        let mut engine = ExpertEngine::new();
        let clear = snapshot(5.0, 5.0, 5.0, false, false, 0.0);
        let first = engine.evaluate(&clear).unwrap();
        let second = engine.evaluate(&clear).unwrap();
        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[test]
    fn immediate_instructions_are_never_deduplicated() {
        let mut engine = ExpertEngine::new();
        let danger = snapshot(3.0, 2.0, 2.0, true, false, 0.0);
        let first = engine.evaluate(&danger).unwrap();
        let second = engine.evaluate(&danger).unwrap();
        assert!(first.is_some());
        assert!(second.is_some());
    }

    #[test]
    fn gps_lost_flag_drives_the_gps_lost_rule() {
        let mut engine = ExpertEngine::new();
        engine.set_gps_lost(true);
        let instruction = engine.evaluate(&snapshot(5.0, 5.0, 5.0, false, false, 0.0)).unwrap().unwrap();
        assert_eq!(instruction.message, "GPS lost, navigation suspended");
    }

    #[test]
    fn fallback_totality_holds_for_an_empty_rule_set() {
        let mut engine = ExpertEngine::with_rules(crate::rules::default_rules());
        for front in [0.2, 0.9, 1.5, 3.0] {
            assert!(engine.evaluate(&snapshot(front, 5.0, 5.0, false, false, 0.0)).unwrap().is_some()
                || engine.last_instruction().is_some());
        }
    }
}
