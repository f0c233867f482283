use crate::models::pick::PickOutcome;
use crate::models::round::DRAW;

/// Map a fixture's result and a pick's chosen team to an outcome verdict.
/// A draw settles every pick on the fixture to LOSE; otherwise the pick wins
/// iff it named the winning team. Total and side-effect-free.
pub fn decide_outcome(result: &str, team: &str) -> PickOutcome {
    if result == DRAW {
        return PickOutcome::Lose;
    }
    if team == result {
        PickOutcome::Win
    } else {
        PickOutcome::Lose
    }
}
