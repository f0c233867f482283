#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Resolved outcome of a pick. NO_PICK rows are synthesized by settlement
/// for active players who submitted nothing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "pick_outcome", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PickOutcome {
    Win,
    Lose,
    NoPick,
}

impl PickOutcome {
    /// Draws count as losses; only WIN preserves a life.
    pub fn costs_a_life(&self) -> bool {
        matches!(self, PickOutcome::Lose | PickOutcome::NoPick)
    }
}

impl std::fmt::Display for PickOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PickOutcome::Win => write!(f, "WIN"),
            PickOutcome::Lose => write!(f, "LOSE"),
            PickOutcome::NoPick => write!(f, "NO_PICK"),
        }
    }
}

/// Pick settlement state. The outcome column is written exactly once.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PickState {
    Pending,
    Settled,
}

impl PickState {
    pub fn can_transition_to(&self, to: &PickState) -> bool {
        match (self, to) {
            (PickState::Pending, PickState::Settled) => true,
            (a, b) if a == b => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PickState::Settled)
    }
}

/// A player's team selection for a round. At most one per (round, player).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pick {
    pub id: Uuid,
    pub round_id: Uuid,
    pub player_id: Uuid,
    pub fixture_id: Option<Uuid>,
    pub team: Option<String>,
    pub outcome: Option<PickOutcome>,
    pub created_at: DateTime<Utc>,
}

impl Pick {
    pub fn state(&self) -> PickState {
        if self.outcome.is_some() {
            PickState::Settled
        } else {
            PickState::Pending
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state() == PickState::Pending
    }
}

/// Append-only per (player, round) progress snapshot. Display only; never
/// read back by the settlement engine.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoundHistory {
    pub id: Uuid,
    pub competition_id: Uuid,
    pub round_id: Uuid,
    pub player_id: Uuid,
    pub team: Option<String>,
    pub outcome: PickOutcome,
    pub recorded_at: DateTime<Utc>,
}
