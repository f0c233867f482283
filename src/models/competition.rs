#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Competition lifecycle status. COMPLETE is terminal and never reverts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "competition_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompetitionStatus {
    Open,
    Complete,
}

impl CompetitionStatus {
    /// Check if transition to another status is valid
    pub fn can_transition_to(&self, to: &CompetitionStatus) -> bool {
        match (self, to) {
            (CompetitionStatus::Open, CompetitionStatus::Complete) => true,
            // Same status is allowed (idempotency)
            (a, b) if a == b => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CompetitionStatus::Complete)
    }
}

impl std::fmt::Display for CompetitionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompetitionStatus::Open => write!(f, "open"),
            CompetitionStatus::Complete => write!(f, "complete"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Competition {
    pub id: Uuid,
    pub name: String,
    pub organiser_id: Uuid,
    pub lives_per_player: i32,
    pub status: CompetitionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Competition {
    /// Only the owning organiser may settle rounds of this competition.
    pub fn is_organiser(&self, caller: Uuid) -> bool {
        self.organiser_id == caller
    }
}

/// Player survival status within a competition. OUT is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "player_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerStatus {
    Active,
    Out,
}

impl PlayerStatus {
    pub fn can_transition_to(&self, to: &PlayerStatus) -> bool {
        match (self, to) {
            (PlayerStatus::Active, PlayerStatus::Out) => true,
            (a, b) if a == b => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PlayerStatus::Out)
    }
}

impl std::fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerStatus::Active => write!(f, "active"),
            PlayerStatus::Out => write!(f, "out"),
        }
    }
}

/// A player's standing within one competition.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompetitionPlayer {
    pub competition_id: Uuid,
    pub player_id: Uuid,
    pub lives_remaining: i32,
    pub status: PlayerStatus,
    pub joined_at: DateTime<Utc>,
}

impl CompetitionPlayer {
    pub fn is_active(&self) -> bool {
        self.status == PlayerStatus::Active
    }

    /// Deduct `losses` lives, clamped at zero. Flips status to OUT when the
    /// clamped value reaches zero. Returns true if the player was eliminated
    /// by this deduction. Invariant: lives_remaining never goes negative and
    /// is monotonically non-increasing.
    pub fn apply_losses(&mut self, losses: i32) -> bool {
        if losses <= 0 || !self.is_active() {
            return false;
        }
        self.lives_remaining = (self.lives_remaining - losses).max(0);
        if self.lives_remaining == 0 {
            self.status = PlayerStatus::Out;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(lives: i32, status: PlayerStatus) -> CompetitionPlayer {
        CompetitionPlayer {
            competition_id: Uuid::new_v4(),
            player_id: Uuid::new_v4(),
            lives_remaining: lives,
            status,
            joined_at: Utc::now(),
        }
    }

    #[test]
    fn test_competition_status_transitions() {
        assert!(CompetitionStatus::Open.can_transition_to(&CompetitionStatus::Complete));
        assert!(CompetitionStatus::Open.can_transition_to(&CompetitionStatus::Open));
        assert!(CompetitionStatus::Complete.can_transition_to(&CompetitionStatus::Complete));
        assert!(!CompetitionStatus::Complete.can_transition_to(&CompetitionStatus::Open));
        assert!(CompetitionStatus::Complete.is_terminal());
    }

    #[test]
    fn test_player_status_transitions() {
        assert!(PlayerStatus::Active.can_transition_to(&PlayerStatus::Out));
        assert!(!PlayerStatus::Out.can_transition_to(&PlayerStatus::Active));
        assert!(PlayerStatus::Out.is_terminal());
    }

    #[test]
    fn test_apply_losses_decrements_without_elimination() {
        let mut p = player(3, PlayerStatus::Active);
        assert!(!p.apply_losses(1));
        assert_eq!(p.lives_remaining, 2);
        assert_eq!(p.status, PlayerStatus::Active);
    }

    #[test]
    fn test_apply_losses_clamps_at_zero_and_eliminates() {
        let mut p = player(1, PlayerStatus::Active);
        assert!(p.apply_losses(3));
        assert_eq!(p.lives_remaining, 0);
        assert_eq!(p.status, PlayerStatus::Out);
    }

    #[test]
    fn test_apply_losses_noop_for_out_player() {
        let mut p = player(0, PlayerStatus::Out);
        assert!(!p.apply_losses(2));
        assert_eq!(p.lives_remaining, 0);
        assert_eq!(p.status, PlayerStatus::Out);
    }

    #[test]
    fn test_apply_losses_noop_for_zero_losses() {
        let mut p = player(2, PlayerStatus::Active);
        assert!(!p.apply_losses(0));
        assert_eq!(p.lives_remaining, 2);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&CompetitionStatus::Open).unwrap(),
            "\"OPEN\""
        );
        assert_eq!(serde_json::to_string(&PlayerStatus::Out).unwrap(), "\"OUT\"");
    }
}
