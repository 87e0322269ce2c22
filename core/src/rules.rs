//! The default rule set for the expert engine, one struct per row of the
//! priority table. Each rule is a pure `(matches, apply)` pair plus
//! metadata — no class hierarchy, just small structs implementing a
//! shared trait.

use cane_contracts::{FollowUpAction, Instruction, InstructionKind};

use crate::snapshot::Snapshot;

/// Context a rule may need beyond the snapshot itself — currently just the
/// pipeline-driven GPS-loss flag consumed by `GpsLostDuringNavigation`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleContext {
    pub gps_lost: bool,
}

/// A priority-tagged predicate/action pair; first match wins.
///
/// `matches`/`apply` take `&mut self` rather than `&self` because one-shot
/// rules (`DestinationReached`, `WaypointReached`) carry a latch that must
/// be updated on every evaluation, not just when they fire.
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;
    fn priority(&self) -> i32;
    fn matches(&mut self, snapshot: &Snapshot, ctx: &RuleContext) -> bool;
    fn apply(&mut self, snapshot: &Snapshot, ctx: &RuleContext) -> Instruction;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Side-selection policy: prefer the lone free side; if both are free,
/// prefer a GPS-consistent side when known, else the larger gap; `None`
/// when neither side is free.
fn pick_side(left_free: bool, right_free: bool, left: f64, right: f64, gps_preferred: Option<bool>) -> Option<Side> {
    match (left_free, right_free) {
        (true, false) => Some(Side::Left),
        (false, true) => Some(Side::Right),
        (false, false) => None,
        (true, true) => match gps_preferred {
            Some(true) => Some(Side::Left),
            Some(false) => Some(Side::Right),
            None => {
                if left >= right {
                    Some(Side::Left)
                } else {
                    Some(Side::Right)
                }
            }
        },
    }
}

fn turn_follow_up(side: Side) -> FollowUpAction {
    match side {
        Side::Left => FollowUpAction::TurnLeft,
        Side::Right => FollowUpAction::TurnRight,
    }
}

// ── 100: HighObstacle ────────────────────────────────────────────────────

pub struct HighObstacleRule;

impl Rule for HighObstacleRule {
    fn name(&self) -> &'static str {
        "HighObstacle"
    }
    fn priority(&self) -> i32 {
        100
    }
    fn matches(&mut self, snapshot: &Snapshot, _ctx: &RuleContext) -> bool {
        snapshot.obstacle_high
    }
    fn apply(&mut self, _snapshot: &Snapshot, _ctx: &RuleContext) -> Instruction {
        Instruction::new(InstructionKind::Warning, "head-height obstacle, stop", true)
    }
}

// ── 95: DestinationReached (one-shot) ────────────────────────────────────

#[derive(Default)]
pub struct DestinationReachedRule {
    latched: bool,
}

impl Rule for DestinationReachedRule {
    fn name(&self) -> &'static str {
        "DestinationReached"
    }
    fn priority(&self) -> i32 {
        95
    }
    fn matches(&mut self, snapshot: &Snapshot, _ctx: &RuleContext) -> bool {
        if !snapshot.is_near_destination() {
            self.latched = false;
            return false;
        }
        if self.latched {
            return false;
        }
        self.latched = true;
        true
    }
    fn apply(&mut self, _snapshot: &Snapshot, _ctx: &RuleContext) -> Instruction {
        Instruction::new(InstructionKind::Guidance, "you have arrived, stop", true)
            .with_follow_up(FollowUpAction::Stop)
    }
}

// ── 90: Water ─────────────────────────────────────────────────────────────

pub struct WaterRule;

impl Rule for WaterRule {
    fn name(&self) -> &'static str {
        "Water"
    }
    fn priority(&self) -> i32 {
        90
    }
    fn matches(&mut self, snapshot: &Snapshot, _ctx: &RuleContext) -> bool {
        snapshot.water_detected
    }
    fn apply(&mut self, _snapshot: &Snapshot, _ctx: &RuleContext) -> Instruction {
        Instruction::new(InstructionKind::Warning, "water on ground, advance slowly", true)
    }
}

// ── 80: ImmediateObstacleFront ───────────────────────────────────────────

pub struct ImmediateObstacleFrontRule;

impl Rule for ImmediateObstacleFrontRule {
    fn name(&self) -> &'static str {
        "ImmediateObstacleFront"
    }
    fn priority(&self) -> i32 {
        80
    }
    fn matches(&mut self, snapshot: &Snapshot, _ctx: &RuleContext) -> bool {
        snapshot.front < 1.0
    }
    fn apply(&mut self, snapshot: &Snapshot, _ctx: &RuleContext) -> Instruction {
        match pick_side(snapshot.left > 1.5, snapshot.right > 1.5, snapshot.left, snapshot.right, None) {
            Some(side) => Instruction::new(
                InstructionKind::Guidance,
                format!("obstacle ahead, turn {} now", if side == Side::Left { "left" } else { "right" }),
                true,
            )
            .with_follow_up(turn_follow_up(side)),
            None => Instruction::new(InstructionKind::Warning, "obstacle ahead, stop", true)
                .with_follow_up(FollowUpAction::Stop),
        }
    }
}

// ── 75: ObstacleOnGpsRoute ───────────────────────────────────────────────

pub struct ObstacleOnGpsRouteRule;

impl Rule for ObstacleOnGpsRouteRule {
    fn name(&self) -> &'static str {
        "ObstacleOnGpsRoute"
    }
    fn priority(&self) -> i32 {
        75
    }
    fn matches(&mut self, snapshot: &Snapshot, _ctx: &RuleContext) -> bool {
        snapshot.has_obstacle_front()
            && snapshot.has_active_destination()
            && snapshot.heading_deviation.is_some_and(|d| d.abs() <= 30.0)
    }
    fn apply(&mut self, snapshot: &Snapshot, _ctx: &RuleContext) -> Instruction {
        let gps_preferred = snapshot.heading_deviation.map(|d| d > 0.0);
        match pick_side(snapshot.left > 2.0, snapshot.right > 2.0, snapshot.left, snapshot.right, gps_preferred) {
            Some(side) => Instruction::new(
                InstructionKind::Guidance,
                format!("obstacle on route, turn {} to detour", if side == Side::Left { "left" } else { "right" }),
                false,
            )
            .with_follow_up(turn_follow_up(side)),
            None => Instruction::new(InstructionKind::Warning, "route blocked, stop", true)
                .with_follow_up(FollowUpAction::Stop),
        }
    }
}

// ── 70: MediumObstacleFront ──────────────────────────────────────────────

pub struct MediumObstacleFrontRule;

impl Rule for MediumObstacleFrontRule {
    fn name(&self) -> &'static str {
        "MediumObstacleFront"
    }
    fn priority(&self) -> i32 {
        70
    }
    fn matches(&mut self, snapshot: &Snapshot, _ctx: &RuleContext) -> bool {
        (1.0..2.0).contains(&snapshot.front)
    }
    fn apply(&mut self, snapshot: &Snapshot, _ctx: &RuleContext) -> Instruction {
        let distance_m = (snapshot.front - 0.5).clamp(0.5, 1.5);
        let side = if snapshot.left >= snapshot.right { Side::Left } else { Side::Right };
        Instruction::new(
            InstructionKind::Guidance,
            format!("obstacle ahead, turn {} soon", if side == Side::Left { "left" } else { "right" }),
            false,
        )
        .with_distance(distance_m)
        .with_follow_up(turn_follow_up(side))
    }
}

// ── 65: GpsLostDuringNavigation (pipeline-driven) ───────────────────────

pub struct GpsLostDuringNavigationRule;

impl Rule for GpsLostDuringNavigationRule {
    fn name(&self) -> &'static str {
        "GpsLostDuringNavigation"
    }
    fn priority(&self) -> i32 {
        65
    }
    fn matches(&mut self, _snapshot: &Snapshot, ctx: &RuleContext) -> bool {
        ctx.gps_lost
    }
    fn apply(&mut self, _snapshot: &Snapshot, _ctx: &RuleContext) -> Instruction {
        Instruction::new(InstructionKind::Warning, "GPS lost, navigation suspended", true)
    }
}

// ── 60: TrajectoryDeviation ──────────────────────────────────────────────

pub struct TrajectoryDeviationRule;

impl Rule for TrajectoryDeviationRule {
    fn name(&self) -> &'static str {
        "TrajectoryDeviation"
    }
    fn priority(&self) -> i32 {
        60
    }
    fn matches(&mut self, snapshot: &Snapshot, _ctx: &RuleContext) -> bool {
        snapshot.is_deviating()
    }
    fn apply(&mut self, snapshot: &Snapshot, _ctx: &RuleContext) -> Instruction {
        if snapshot.imu.yaw.abs() > 30.0 {
            Instruction::new(
                InstructionKind::Correction,
                "drifting badly, go back one meter then turn to return to course",
                false,
            )
        } else {
            Instruction::new(InstructionKind::Correction, "drifting, turn to return to course", false)
        }
    }
}

// ── 50: LateralObstacle ──────────────────────────────────────────────────

pub struct LateralObstacleRule;

impl Rule for LateralObstacleRule {
    fn name(&self) -> &'static str {
        "LateralObstacle"
    }
    fn priority(&self) -> i32 {
        50
    }
    fn matches(&mut self, snapshot: &Snapshot, _ctx: &RuleContext) -> bool {
        snapshot.has_obstacle_left() || snapshot.has_obstacle_right()
    }
    fn apply(&mut self, snapshot: &Snapshot, _ctx: &RuleContext) -> Instruction {
        match (snapshot.has_obstacle_left(), snapshot.has_obstacle_right()) {
            (true, true) => Instruction::new(InstructionKind::Warning, "narrow passage, advance slowly", false),
            (true, false) => Instruction::new(InstructionKind::Warning, "obstacle on left, turn right", false)
                .with_follow_up(FollowUpAction::TurnRight),
            (false, true) => Instruction::new(InstructionKind::Warning, "obstacle on right, turn left", false)
                .with_follow_up(FollowUpAction::TurnLeft),
            (false, false) => unreachable!("matches() guarantees at least one side is close"),
        }
    }
}

// ── 40: WaypointReached (one-shot) ───────────────────────────────────────

#[derive(Default)]
pub struct WaypointReachedRule {
    latched: bool,
}

impl Rule for WaypointReachedRule {
    fn name(&self) -> &'static str {
        "WaypointReached"
    }
    fn priority(&self) -> i32 {
        40
    }
    fn matches(&mut self, snapshot: &Snapshot, _ctx: &RuleContext) -> bool {
        let condition = snapshot.is_near_waypoint() && !snapshot.is_near_destination();
        if !condition {
            self.latched = false;
            return false;
        }
        if self.latched {
            return false;
        }
        self.latched = true;
        true
    }
    fn apply(&mut self, _snapshot: &Snapshot, _ctx: &RuleContext) -> Instruction {
        Instruction::new(InstructionKind::Guidance, "waypoint reached, continue straight", false)
            .with_follow_up(FollowUpAction::Continue)
    }
}

// ── 10: GpsNavigation ────────────────────────────────────────────────────

pub struct GpsNavigationRule;

impl Rule for GpsNavigationRule {
    fn name(&self) -> &'static str {
        "GpsNavigation"
    }
    fn priority(&self) -> i32 {
        10
    }
    fn matches(&mut self, snapshot: &Snapshot, _ctx: &RuleContext) -> bool {
        snapshot.has_active_destination() && snapshot.is_off_course() && !snapshot.has_obstacle_front()
    }
    fn apply(&mut self, snapshot: &Snapshot, _ctx: &RuleContext) -> Instruction {
        let deviation = snapshot.heading_deviation.unwrap_or(0.0);
        let side = if deviation > 0.0 { "left" } else { "right" };
        Instruction::new(InstructionKind::Guidance, format!("drifting off course, turn {side} to continue"), false)
            .with_follow_up(if deviation > 0.0 { FollowUpAction::TurnLeft } else { FollowUpAction::TurnRight })
    }
}

// ── 0: ClearPath ─────────────────────────────────────────────────────────

pub struct ClearPathRule;

impl Rule for ClearPathRule {
    fn name(&self) -> &'static str {
        "ClearPath"
    }
    fn priority(&self) -> i32 {
        0
    }
    fn matches(&mut self, _snapshot: &Snapshot, _ctx: &RuleContext) -> bool {
        true
    }
    fn apply(&mut self, _snapshot: &Snapshot, _ctx: &RuleContext) -> Instruction {
        Instruction::new(InstructionKind::Guidance, "clear, continue", false).with_follow_up(FollowUpAction::Continue)
    }
}

/// The default rule set, already ordered by descending priority.
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(HighObstacleRule),
        Box::new(DestinationReachedRule::default()),
        Box::new(WaterRule),
        Box::new(ImmediateObstacleFrontRule),
        Box::new(ObstacleOnGpsRouteRule),
        Box::new(MediumObstacleFrontRule),
        Box::new(GpsLostDuringNavigationRule),
        Box::new(TrajectoryDeviationRule),
        Box::new(LateralObstacleRule),
        Box::new(WaypointReachedRule::default()),
        Box::new(GpsNavigationRule),
        Box::new(ClearPathRule),
    ]
}
