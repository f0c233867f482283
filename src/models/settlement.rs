#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// Why a competition was flipped to COMPLETE.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionCause {
    AllEliminated,
    SingleSurvivor,
}

impl std::fmt::Display for CompletionCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletionCause::AllEliminated => write!(f, "all eliminated"),
            CompletionCause::SingleSurvivor => write!(f, "single survivor"),
        }
    }
}

/// Result of the completion evaluation run at the end of a settlement pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub complete: bool,
    pub cause: Option<CompletionCause>,
    pub active_players: i64,
    /// True only on the pass that flipped the competition to COMPLETE.
    pub newly_complete: bool,
}

/// Aggregate counts returned by one settlement pass. A second pass over an
/// already-settled round returns all-zero counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SettlementSummary {
    pub winners: i64,
    /// Draws count as losses.
    pub losers: i64,
    /// Picks given a new outcome this pass, no-pick insertions included.
    pub processed: i64,
    pub players_eliminated: i64,
    pub no_pick_processed: i64,
    /// Total picks in the round after this pass, synthetic rows included.
    pub total: i64,
    pub active_players: i64,
    pub competition_complete: bool,
}

impl SettlementSummary {
    pub fn is_noop(&self) -> bool {
        self.winners == 0
            && self.losers == 0
            && self.processed == 0
            && self.players_eliminated == 0
            && self.no_pick_processed == 0
    }
}
