#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Sentinel result value for a drawn fixture. Draws never reward a pick.
pub const DRAW: &str = "DRAW";

/// One elimination cycle of a competition.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Round {
    pub id: Uuid,
    pub competition_id: Uuid,
    pub round_number: i32,
    pub no_pick_processed: bool,
    pub created_at: DateTime<Utc>,
}

/// Round settlement state, derived from fixture results and the
/// no_pick_processed flag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundState {
    /// At least one fixture still has no result.
    Open,
    /// Every fixture has a result; no-pick penalty not yet applied.
    FullyResulted,
    /// No-pick penalty applied; terminal.
    NoPickSettled,
}

impl RoundState {
    pub fn can_transition_to(&self, to: &RoundState) -> bool {
        match (self, to) {
            (RoundState::Open, RoundState::FullyResulted) => true,
            (RoundState::FullyResulted, RoundState::NoPickSettled) => true,
            // Same state is allowed (idempotency)
            (a, b) if a == b => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RoundState::NoPickSettled)
    }
}

impl Round {
    /// Authoritative round state given the fixture tally for this round.
    pub fn state(&self, total_fixtures: usize, resulted_fixtures: usize) -> RoundState {
        if self.no_pick_processed {
            RoundState::NoPickSettled
        } else if total_fixtures > 0 && resulted_fixtures == total_fixtures {
            RoundState::FullyResulted
        } else {
            RoundState::Open
        }
    }

    /// The no-pick penalty is applied exactly once, and only once every
    /// fixture in the round carries a result.
    pub fn no_pick_penalty_due(&self, total_fixtures: usize, resulted_fixtures: usize) -> bool {
        self.state(total_fixtures, resulted_fixtures) == RoundState::FullyResulted
    }
}

/// A single match between two teams within a round.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Fixture {
    pub id: Uuid,
    pub round_id: Uuid,
    pub home_team: String,
    pub away_team: String,
    /// Home team code, away team code, or the DRAW sentinel. Written by the
    /// administration layer; read-only to settlement.
    pub result: Option<String>,
    /// Written exactly once by settlement; gates re-processing.
    pub processed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fixture settlement state, derived from the result/processed columns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixtureState {
    Unresulted,
    Resulted,
    Settled,
}

impl FixtureState {
    pub fn can_transition_to(&self, to: &FixtureState) -> bool {
        match (self, to) {
            (FixtureState::Unresulted, FixtureState::Resulted) => true,
            (FixtureState::Resulted, FixtureState::Settled) => true,
            (a, b) if a == b => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FixtureState::Settled)
    }
}

impl Fixture {
    pub fn state(&self) -> FixtureState {
        match (&self.result, &self.processed) {
            (None, _) => FixtureState::Unresulted,
            (Some(_), None) => FixtureState::Resulted,
            (Some(_), Some(_)) => FixtureState::Settled,
        }
    }

    /// A fixture contributes outcomes exactly once: when it holds a result
    /// and has not been marked processed.
    pub fn ready_to_settle(&self) -> bool {
        self.state() == FixtureState::Resulted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(result: Option<&str>, processed: bool) -> Fixture {
        Fixture {
            id: Uuid::new_v4(),
            round_id: Uuid::new_v4(),
            home_team: "ARS".to_string(),
            away_team: "CHE".to_string(),
            result: result.map(|r| r.to_string()),
            processed: processed.then(Utc::now),
            created_at: Utc::now(),
        }
    }

    fn round(no_pick_processed: bool) -> Round {
        Round {
            id: Uuid::new_v4(),
            competition_id: Uuid::new_v4(),
            round_number: 1,
            no_pick_processed,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_fixture_state_derivation() {
        assert_eq!(fixture(None, false).state(), FixtureState::Unresulted);
        assert_eq!(fixture(Some("ARS"), false).state(), FixtureState::Resulted);
        assert_eq!(fixture(Some(DRAW), true).state(), FixtureState::Settled);
    }

    #[test]
    fn test_fixture_state_transitions() {
        assert!(FixtureState::Unresulted.can_transition_to(&FixtureState::Resulted));
        assert!(FixtureState::Resulted.can_transition_to(&FixtureState::Settled));
        assert!(!FixtureState::Unresulted.can_transition_to(&FixtureState::Settled));
        assert!(!FixtureState::Settled.can_transition_to(&FixtureState::Resulted));
        assert!(FixtureState::Settled.is_terminal());
    }

    #[test]
    fn test_ready_to_settle_requires_result_and_unprocessed() {
        assert!(!fixture(None, false).ready_to_settle());
        assert!(fixture(Some("CHE"), false).ready_to_settle());
        assert!(!fixture(Some("CHE"), true).ready_to_settle());
    }

    #[test]
    fn test_round_state_derivation() {
        let r = round(false);
        assert_eq!(r.state(2, 1), RoundState::Open);
        assert_eq!(r.state(2, 2), RoundState::FullyResulted);
        assert_eq!(round(true).state(2, 2), RoundState::NoPickSettled);
        // A round with no fixtures never becomes fully resulted
        assert_eq!(r.state(0, 0), RoundState::Open);
    }

    #[test]
    fn test_no_pick_penalty_gating() {
        assert!(!round(false).no_pick_penalty_due(2, 1));
        assert!(round(false).no_pick_penalty_due(2, 2));
        assert!(!round(true).no_pick_penalty_due(2, 2));
    }

    #[test]
    fn test_round_state_transitions() {
        assert!(RoundState::Open.can_transition_to(&RoundState::FullyResulted));
        assert!(RoundState::FullyResulted.can_transition_to(&RoundState::NoPickSettled));
        assert!(!RoundState::Open.can_transition_to(&RoundState::NoPickSettled));
        assert!(!RoundState::NoPickSettled.can_transition_to(&RoundState::Open));
    }
}
