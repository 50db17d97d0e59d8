//! Down-and-distance arithmetic for accepted penalties.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::game::{Distance, Side};

/// A penalty as called on the field, before enforcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PenaltyCall {
    /// Team that committed the foul.
    pub team: Side,
    /// Foul name as announced.
    pub name: String,
    /// Yardage assessed.
    pub yards: u8,
    /// Defensive fouls that award an automatic first down.
    #[serde(default)]
    pub auto_first_down: bool,
    /// Offensive fouls that also cost the down.
    #[serde(default)]
    pub loss_of_down: bool,
}

/// Down and yards to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownAndDistance {
    /// Current down, 1 to 4.
    pub down: u8,
    /// Yards to go.
    pub distance: Distance,
}

impl DownAndDistance {
    /// First and ten.
    pub const FIRST_AND_TEN: Self = Self {
        down: 1,
        distance: Distance::Yards(10),
    };
}

/// Compute the down and distance after enforcing `call`.
///
/// Whether the foul is offensive or defensive is decided against `possession`.
/// Without a team in possession nothing is enforced. Goal-to-go stays goal-to-go
/// unless the foul awards a first down.
pub fn enforce(
    call: &PenaltyCall,
    possession: Option<Side>,
    current: DownAndDistance,
) -> DownAndDistance {
    let Some(offense) = possession else {
        return current;
    };
    let yards = i32::from(call.yards);
    let offensive = call.team == offense;

    if !offensive {
        if call.auto_first_down {
            return DownAndDistance::FIRST_AND_TEN;
        }
        return match current.distance.yards() {
            None => current,
            Some(to_go) => {
                let remaining = to_go - yards;
                if remaining <= 0 {
                    DownAndDistance::FIRST_AND_TEN
                } else {
                    DownAndDistance {
                        down: current.down,
                        distance: Distance::Yards(clamp_yards(remaining)),
                    }
                }
            }
        };
    }

    let down = if call.loss_of_down {
        (current.down + 1).min(4)
    } else {
        current.down
    };
    let distance = match current.distance.yards() {
        None => Distance::Goal,
        Some(to_go) => Distance::Yards(clamp_yards(to_go + yards)),
    };
    DownAndDistance { down, distance }
}

fn clamp_yards(yards: i32) -> u8 {
    yards.clamp(1, 99) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(team: Side, yards: u8) -> PenaltyCall {
        PenaltyCall {
            team,
            name: "Holding".into(),
            yards,
            auto_first_down: false,
            loss_of_down: false,
        }
    }

    fn at(down: u8, yards: u8) -> DownAndDistance {
        DownAndDistance {
            down,
            distance: Distance::Yards(yards),
        }
    }

    #[test]
    fn defensive_auto_first_down_is_symmetric() {
        for offense in [Side::Home, Side::Away] {
            let mut foul = call(offense.opponent(), 10);
            foul.auto_first_down = true;
            let result = enforce(&foul, Some(offense), at(2, 10));
            assert_eq!(result, DownAndDistance::FIRST_AND_TEN, "offense {offense:?}");
        }
    }

    #[test]
    fn offensive_loss_of_down_adds_yardage_and_down() {
        let mut foul = call(Side::Home, 5);
        foul.loss_of_down = true;
        assert_eq!(enforce(&foul, Some(Side::Home), at(2, 8)), at(3, 13));
        assert_eq!(enforce(&foul, Some(Side::Home), at(4, 8)), at(4, 13));
    }

    #[test]
    fn offensive_foul_replays_the_down() {
        let foul = call(Side::Away, 10);
        assert_eq!(enforce(&foul, Some(Side::Away), at(3, 4)), at(3, 14));
    }

    #[test]
    fn defensive_foul_subtracts_and_can_reach_first_down() {
        let foul = call(Side::Home, 5);
        assert_eq!(enforce(&foul, Some(Side::Away), at(3, 8)), at(3, 3));
        assert_eq!(
            enforce(&foul, Some(Side::Away), at(3, 5)),
            DownAndDistance::FIRST_AND_TEN
        );
        let inches = DownAndDistance {
            down: 4,
            distance: Distance::Inches,
        };
        assert_eq!(
            enforce(&foul, Some(Side::Away), inches),
            DownAndDistance::FIRST_AND_TEN
        );
    }

    #[test]
    fn goal_to_go_is_preserved() {
        let goal = DownAndDistance {
            down: 2,
            distance: Distance::Goal,
        };
        assert_eq!(enforce(&call(Side::Home, 5), Some(Side::Away), goal), goal);
        assert_eq!(enforce(&call(Side::Away, 5), Some(Side::Away), goal), goal);
    }

    #[test]
    fn nothing_enforced_without_possession() {
        assert_eq!(enforce(&call(Side::Home, 15), None, at(2, 6)), at(2, 6));
    }
}
