use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::geo::{
    bearing_degrees, distance_meters, min_distance_meters_to_vertices, round_for_display, LngLat,
};
use crate::model::{AppPhase, NavigationSession, TurnInstruction, DESTINATION_INSTRUCTION};

/// Icon shown next to the upcoming instruction.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ManeuverIcon {
    #[default]
    None,
    Straight,
    Right,
    Left,
    BearRight,
    BearLeft,
    SharpRight,
    SharpLeft,
}

impl ManeuverIcon {
    /// Maps a backend instruction to its icon. Unknown instructions (including
    /// "Start" and "Destination") have no icon.
    #[must_use]
    pub fn for_instruction(instruction: &str) -> Self {
        match instruction {
            "straight" => Self::Straight,
            "right" => Self::Right,
            "left" => Self::Left,
            "keep right" | "slight right" => Self::BearRight,
            "keep left" | "slight left" => Self::BearLeft,
            "sharp right" => Self::SharpRight,
            "sharp left" => Self::SharpLeft,
            _ => Self::None,
        }
    }

    /// Tabler icon id for the maneuver; empty for `None`.
    #[must_use]
    pub const fn icon_name(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Straight => "arrow-narrow-up",
            Self::Right => "corner-up-right",
            Self::Left => "corner-up-left",
            Self::BearRight => "arrow-bear-right",
            Self::BearLeft => "arrow-bear-left",
            Self::SharpRight => "arrow-sharp-turn-right",
            Self::SharpLeft => "arrow-sharp-turn-left",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnDisplay {
    pub icon: ManeuverIcon,
    pub text: String,
}

impl TurnDisplay {
    /// Instructions with an icon show only the distance; the rest spell out
    /// the instruction ("Destination in 50m").
    #[must_use]
    pub fn compose(instruction: &str, rounded_meters: u32) -> Self {
        let icon = ManeuverIcon::for_instruction(instruction);
        let text = match icon {
            ManeuverIcon::None => format!("{instruction} in {rounded_meters}m"),
            _ => format!("{rounded_meters}m"),
        };
        Self { icon, text }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GuidanceOutcome {
    pub target_index: Option<usize>,
    /// New off-path verdict, present only when it changed.
    pub off_path_changed: Option<bool>,
    pub arrived: bool,
}

/// Index of the instruction the rider is heading towards: the one right
/// after the segment between consecutive instructions closest to `position`.
/// Ties keep the earliest segment. Needs at least two instructions.
#[must_use]
pub fn determine_target_index(position: LngLat, instructions: &[TurnInstruction]) -> Option<usize> {
    match instructions {
        [] | [_] => None,
        _ => {
            let mut best = 1;
            let mut best_distance = f64::INFINITY;
            for (i, pair) in instructions.windows(2).enumerate() {
                let d = crate::geo::point_to_segment_distance_squared(
                    position,
                    pair[0].coordinate,
                    pair[1].coordinate,
                );
                if d < best_distance {
                    best_distance = d;
                    best = i + 1;
                }
            }
            Some(best)
        }
    }
}

/// Processes one position fix against the session.
///
/// The fix is always stored. Outside active guidance only the camera follows
/// it; in `Routing` the off-path verdict, turn display and camera bearing are
/// refreshed and arrival is detected. Finishing on arrival is left to the
/// caller.
pub fn on_position_update(
    session: &mut NavigationSession,
    position: LngLat,
    heading: Option<f64>,
) -> GuidanceOutcome {
    session.set_position(position, heading);

    let mut outcome = GuidanceOutcome::default();
    let phase = session.phase();
    if !phase.follows_position() {
        return outcome;
    }
    session.camera_mut().center = position;
    if phase != AppPhase::Routing {
        return outcome;
    }

    let Some(route) = session.route() else {
        return outcome;
    };

    let deviation = min_distance_meters_to_vertices(position, route.geometry());
    let target = determine_target_index(position, route.turn_instructions()).map(|index| {
        let instructions = route.turn_instructions();
        let previous = index.checked_sub(1).map(|i| instructions[i].coordinate);
        (index, instructions[index].clone(), previous)
    });

    let off_path = deviation > session.config().off_path_threshold_m;
    if session.set_off_path(off_path) {
        info!(off_path, deviation_m = deviation, "off-path state changed");
        outcome.off_path_changed = Some(off_path);
    }

    let Some((index, instruction, previous)) = target else {
        return outcome;
    };
    outcome.target_index = Some(index);

    let distance = distance_meters(position, instruction.coordinate);
    session.set_turn_display(TurnDisplay::compose(
        &instruction.instruction,
        round_for_display(distance),
    ));

    if let Some(previous) = previous {
        session.camera_mut().bearing = bearing_degrees(previous, instruction.coordinate);
    }

    if instruction.instruction == DESTINATION_INSTRUCTION
        && distance < session.config().arrival_radius_m
    {
        debug!(distance_m = distance, "destination reached");
        outcome.arrived = true;
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Route;
    use proptest::prelude::*;

    fn p(lng: f64, lat: f64) -> LngLat {
        LngLat { lng, lat }
    }

    fn routing_session(geometry: Vec<LngLat>, instructions: Vec<TurnInstruction>) -> NavigationSession {
        let mut session = NavigationSession::default();
        session.replace_route(Route::new(geometry, instructions).unwrap(), None);
        session.set_phase(AppPhase::Routing);
        session
    }

    fn three_stop_route() -> Vec<TurnInstruction> {
        vec![
            TurnInstruction::new(p(0.0, 0.0), "Start"),
            TurnInstruction::new(p(0.0, 0.001), "right"),
            TurnInstruction::new(p(0.001, 0.001), "Destination"),
        ]
    }

    #[test]
    fn icons_match_instructions() {
        assert_eq!(ManeuverIcon::for_instruction("straight").icon_name(), "arrow-narrow-up");
        assert_eq!(ManeuverIcon::for_instruction("sharp left").icon_name(), "arrow-sharp-turn-left");
        assert_eq!(ManeuverIcon::for_instruction("slight right"), ManeuverIcon::BearRight);
        assert_eq!(ManeuverIcon::for_instruction("keep left"), ManeuverIcon::BearLeft);
        assert_eq!(ManeuverIcon::for_instruction("Start"), ManeuverIcon::None);
        assert_eq!(ManeuverIcon::for_instruction("u-turn").icon_name(), "");
    }

    #[test]
    fn display_text_depends_on_icon() {
        assert_eq!(TurnDisplay::compose("right", 150).text, "150m");
        assert_eq!(TurnDisplay::compose("Destination", 50).text, "Destination in 50m");
    }

    #[test]
    fn target_index_edge_cases() {
        assert_eq!(determine_target_index(p(0.0, 0.0), &[]), None);
        let single = [TurnInstruction::new(p(1.0, 1.0), "Start")];
        assert_eq!(determine_target_index(p(0.0, 0.0), &single), None);
    }

    #[test]
    fn collinear_route_targets_second_instruction() {
        let instructions = vec![
            TurnInstruction::new(p(0.0, 0.0), "Start"),
            TurnInstruction::new(p(0.0, 1.0), "straight"),
            TurnInstruction::new(p(0.0, 2.0), "Destination"),
        ];
        assert_eq!(determine_target_index(p(0.0, 0.5), &instructions), Some(1));
        assert_eq!(determine_target_index(p(0.0, 1.5), &instructions), Some(2));
    }

    #[test]
    fn position_outside_guidance_only_stores_fix() {
        let mut session = NavigationSession::default();
        let camera = *session.camera();
        let outcome = on_position_update(&mut session, p(8.0, 47.0), Some(90.0));

        assert_eq!(outcome, GuidanceOutcome::default());
        assert_eq!(session.position(), Some(p(8.0, 47.0)));
        assert_eq!(session.heading(), 90.0);
        assert_eq!(session.camera(), &camera);
    }

    #[test]
    fn finished_phase_only_recenters() {
        let mut session = NavigationSession::default();
        session.set_phase(AppPhase::FinishedRouting);
        let outcome = on_position_update(&mut session, p(8.0, 47.0), None);

        assert_eq!(outcome, GuidanceOutcome::default());
        assert_eq!(session.camera().center, p(8.0, 47.0));
        assert_eq!(session.turn_display(), &TurnDisplay::default());
    }

    #[test]
    fn routing_updates_display_and_bearing() {
        let route = three_stop_route();
        let mut session = routing_session(route.iter().map(|t| t.coordinate).collect(), route);

        let outcome = on_position_update(&mut session, p(0.0, 0.0005), None);

        assert_eq!(outcome.target_index, Some(1));
        assert!(!outcome.arrived);
        assert_eq!(session.turn_display().icon, ManeuverIcon::Right);
        assert_eq!(session.turn_display().text, "50m");
        assert!(session.camera().bearing.abs() < 1e-9);
        assert_eq!(session.camera().center, p(0.0, 0.0005));
    }

    #[test]
    fn single_instruction_leaves_display_alone() {
        let start = vec![TurnInstruction::new(p(0.0, 0.0), "Start")];
        let mut session = routing_session(vec![p(0.0, 0.0)], start);
        session.camera_mut().bearing = 42.0;

        let outcome = on_position_update(&mut session, p(0.0, 0.0), None);

        assert_eq!(outcome.target_index, None);
        assert_eq!(session.camera().bearing, 42.0);
        assert_eq!(session.turn_display(), &TurnDisplay::default());
    }

    #[test]
    fn off_path_is_reported_once_per_flip() {
        let route = three_stop_route();
        let mut session = routing_session(route.iter().map(|t| t.coordinate).collect(), route);

        let far = p(0.01, 0.0);
        assert_eq!(on_position_update(&mut session, far, None).off_path_changed, Some(true));
        assert_eq!(on_position_update(&mut session, far, None).off_path_changed, None);
        assert!(session.is_off_path());

        let near = p(0.0, 0.0);
        assert_eq!(on_position_update(&mut session, near, None).off_path_changed, Some(false));
        assert!(!session.is_off_path());
    }

    #[test]
    fn arrival_within_radius_of_destination() {
        let route = three_stop_route();
        let mut session = routing_session(route.iter().map(|t| t.coordinate).collect(), route);

        let outcome = on_position_update(&mut session, p(0.001, 0.001), None);
        assert_eq!(outcome.target_index, Some(2));
        assert!(outcome.arrived);
        assert_eq!(session.turn_display().text, "Destination in 0m");
    }

    proptest! {
        #[test]
        fn target_index_is_in_range(
            lng in -10.0f64..10.0,
            lat in -10.0f64..10.0,
            count in 2usize..8,
        ) {
            let instructions: Vec<_> = (0..count)
                .map(|i| TurnInstruction::new(p(i as f64, 0.0), "straight"))
                .collect();
            let index = determine_target_index(p(lng, lat), &instructions).unwrap();
            prop_assert!(index >= 1 && index < count);
        }
    }
}
