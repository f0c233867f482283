use std::collections::{BTreeMap, HashSet};

use uuid::Uuid;

use crate::models::competition::{Competition, CompetitionPlayer};
use crate::models::pick::{Pick, PickOutcome};
use crate::models::round::{Fixture, Round};
use crate::service::outcome_calculator::decide_outcome;

/// In-memory view of everything one settlement pass reads, loaded under the
/// round lock.
#[derive(Debug, Clone)]
pub struct RoundSnapshot {
    pub competition: Competition,
    pub round: Round,
    pub fixtures: Vec<Fixture>,
    pub picks: Vec<Pick>,
    pub players: Vec<CompetitionPlayer>,
}

/// Outcome assigned to one pending pick this pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickVerdict {
    pub pick_id: Uuid,
    pub player_id: Uuid,
    pub fixture_id: Uuid,
    pub outcome: PickOutcome,
}

/// Life deduction owed to one player from this pass's LOSE verdicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifeAdjustment {
    pub player_id: Uuid,
    pub losses: i32,
    pub lives_after: i32,
    pub eliminated: bool,
}

/// One-life penalty for an active player with no pick in a fully-resulted
/// round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoPickPenalty {
    pub player_id: Uuid,
    pub lives_after: i32,
    pub eliminated: bool,
}

/// Everything one settlement pass will write, derived purely from a
/// snapshot. Planning over an already-settled round yields an empty plan,
/// which is what makes retries and concurrent invocations harmless.
#[derive(Debug, Clone)]
pub struct SettlementPlan {
    pub verdicts: Vec<PickVerdict>,
    pub fixtures_to_settle: Vec<Uuid>,
    pub adjustments: Vec<LifeAdjustment>,
    pub no_pick_penalties: Vec<NoPickPenalty>,
    /// Set rounds.no_pick_processed this pass (true even when nobody needed
    /// the penalty, so a rerun can never re-apply it).
    pub mark_no_pick_processed: bool,
    /// Players still active once every deduction in this plan lands.
    pub active_players_after: i64,
}

impl SettlementPlan {
    pub fn winners(&self) -> i64 {
        self.verdicts
            .iter()
            .filter(|v| v.outcome == PickOutcome::Win)
            .count() as i64
    }

    pub fn losers(&self) -> i64 {
        self.verdicts
            .iter()
            .filter(|v| v.outcome == PickOutcome::Lose)
            .count() as i64
    }

    /// Picks given a new outcome this pass, no-pick insertions included.
    pub fn processed(&self) -> i64 {
        (self.verdicts.len() + self.no_pick_penalties.len()) as i64
    }

    pub fn players_eliminated(&self) -> i64 {
        let from_losses = self.adjustments.iter().filter(|a| a.eliminated).count();
        let from_no_pick = self.no_pick_penalties.iter().filter(|p| p.eliminated).count();
        (from_losses + from_no_pick) as i64
    }

    pub fn no_pick_count(&self) -> i64 {
        self.no_pick_penalties.len() as i64
    }

    pub fn lose_pick_ids(&self) -> Vec<Uuid> {
        self.verdicts
            .iter()
            .filter(|v| v.outcome == PickOutcome::Lose)
            .map(|v| v.pick_id)
            .collect()
    }

    pub fn win_pick_ids(&self) -> Vec<Uuid> {
        self.verdicts
            .iter()
            .filter(|v| v.outcome == PickOutcome::Win)
            .map(|v| v.pick_id)
            .collect()
    }

    pub fn settled_pick_ids(&self) -> Vec<Uuid> {
        self.verdicts.iter().map(|v| v.pick_id).collect()
    }

    pub fn competition_complete(&self) -> bool {
        self.active_players_after <= 1
    }

    pub fn is_noop(&self) -> bool {
        self.verdicts.is_empty()
            && self.fixtures_to_settle.is_empty()
            && self.no_pick_penalties.is_empty()
            && !self.mark_no_pick_processed
    }
}

/// Phases 1-5 of a settlement pass as one pure transition over the entity
/// state machines: verdicts for picks on resulted-but-unsettled fixtures,
/// aggregated life deductions with the clamp-at-zero rule, and the
/// once-only no-pick penalty for a fully-resulted round.
pub fn build_plan(snapshot: &RoundSnapshot) -> SettlementPlan {
    let mut verdicts = Vec::new();
    let mut fixtures_to_settle = Vec::new();

    for fixture in &snapshot.fixtures {
        if !fixture.ready_to_settle() {
            continue;
        }
        let Some(result) = fixture.result.as_deref() else {
            continue;
        };
        fixtures_to_settle.push(fixture.id);

        for pick in &snapshot.picks {
            if pick.fixture_id != Some(fixture.id) || !pick.is_pending() {
                continue;
            }
            // A pick with no team recorded can never match the result
            let outcome = match pick.team.as_deref() {
                Some(team) => decide_outcome(result, team),
                None => PickOutcome::Lose,
            };
            verdicts.push(PickVerdict {
                pick_id: pick.id,
                player_id: pick.player_id,
                fixture_id: fixture.id,
                outcome,
            });
        }
    }

    // Per-player LOSE counts from this pass only; a pick's outcome is
    // written once, so reruns contribute zero additional losses.
    let mut losses_by_player: BTreeMap<Uuid, i32> = BTreeMap::new();
    for verdict in &verdicts {
        if verdict.outcome == PickOutcome::Lose {
            *losses_by_player.entry(verdict.player_id).or_insert(0) += 1;
        }
    }

    let mut players: BTreeMap<Uuid, CompetitionPlayer> = snapshot
        .players
        .iter()
        .map(|p| (p.player_id, p.clone()))
        .collect();

    let mut adjustments = Vec::new();
    for (player_id, losses) in &losses_by_player {
        let Some(player) = players.get_mut(player_id) else {
            continue;
        };
        if !player.is_active() {
            continue;
        }
        let eliminated = player.apply_losses(*losses);
        adjustments.push(LifeAdjustment {
            player_id: *player_id,
            losses: *losses,
            lives_after: player.lives_remaining,
            eliminated,
        });
    }

    let total_fixtures = snapshot.fixtures.len();
    let resulted_fixtures = snapshot
        .fixtures
        .iter()
        .filter(|f| f.result.is_some())
        .count();
    let mark_no_pick_processed = snapshot
        .round
        .no_pick_penalty_due(total_fixtures, resulted_fixtures);

    let mut no_pick_penalties = Vec::new();
    if mark_no_pick_processed {
        let picked: HashSet<Uuid> = snapshot.picks.iter().map(|p| p.player_id).collect();
        let absent: Vec<Uuid> = players
            .values()
            .filter(|p| p.is_active() && !picked.contains(&p.player_id))
            .map(|p| p.player_id)
            .collect();
        for player_id in absent {
            let Some(player) = players.get_mut(&player_id) else {
                continue;
            };
            let eliminated = player.apply_losses(1);
            no_pick_penalties.push(NoPickPenalty {
                player_id,
                lives_after: player.lives_remaining,
                eliminated,
            });
        }
    }

    let active_players_after = players.values().filter(|p| p.is_active()).count() as i64;

    SettlementPlan {
        verdicts,
        fixtures_to_settle,
        adjustments,
        no_pick_penalties,
        mark_no_pick_processed,
        active_players_after,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::competition::{CompetitionStatus, PlayerStatus};
    use crate::models::round::DRAW;
    use chrono::Utc;

    struct SnapshotBuilder {
        snapshot: RoundSnapshot,
    }

    impl SnapshotBuilder {
        fn new(lives_per_player: i32) -> Self {
            let competition_id = Uuid::new_v4();
            let round_id = Uuid::new_v4();
            Self {
                snapshot: RoundSnapshot {
                    competition: Competition {
                        id: competition_id,
                        name: "Test Competition".to_string(),
                        organiser_id: Uuid::new_v4(),
                        lives_per_player,
                        status: CompetitionStatus::Open,
                        created_at: Utc::now(),
                        updated_at: Utc::now(),
                    },
                    round: Round {
                        id: round_id,
                        competition_id,
                        round_number: 1,
                        no_pick_processed: false,
                        created_at: Utc::now(),
                    },
                    fixtures: vec![],
                    picks: vec![],
                    players: vec![],
                },
            }
        }

        fn fixture(&mut self, result: Option<&str>, processed: bool) -> Uuid {
            let id = Uuid::new_v4();
            self.snapshot.fixtures.push(Fixture {
                id,
                round_id: self.snapshot.round.id,
                home_team: "HOME".to_string(),
                away_team: "AWAY".to_string(),
                result: result.map(|r| r.to_string()),
                processed: processed.then(Utc::now),
                created_at: Utc::now(),
            });
            id
        }

        fn player(&mut self, lives: i32) -> Uuid {
            let id = Uuid::new_v4();
            self.snapshot.players.push(CompetitionPlayer {
                competition_id: self.snapshot.competition.id,
                player_id: id,
                lives_remaining: lives,
                status: if lives > 0 {
                    PlayerStatus::Active
                } else {
                    PlayerStatus::Out
                },
                joined_at: Utc::now(),
            });
            id
        }

        fn pick(&mut self, player_id: Uuid, fixture_id: Uuid, team: &str) -> Uuid {
            self.pick_with_outcome(player_id, fixture_id, team, None)
        }

        fn pick_with_outcome(
            &mut self,
            player_id: Uuid,
            fixture_id: Uuid,
            team: &str,
            outcome: Option<PickOutcome>,
        ) -> Uuid {
            let id = Uuid::new_v4();
            self.snapshot.picks.push(Pick {
                id,
                round_id: self.snapshot.round.id,
                player_id,
                fixture_id: Some(fixture_id),
                team: Some(team.to_string()),
                outcome,
                created_at: Utc::now(),
            });
            id
        }

        fn build(self) -> RoundSnapshot {
            self.snapshot
        }
    }

    #[test]
    fn test_draw_and_win_scenario() {
        // Fixture A result DRAW, fixture B result ARS. Player1 ARS on B wins,
        // Player2 CHE on B loses, Player3 loses on the draw.
        let mut b = SnapshotBuilder::new(3);
        let fixture_a = b.fixture(Some(DRAW), false);
        let fixture_b = b.fixture(Some("ARS"), false);
        let p1 = b.player(3);
        let p2 = b.player(3);
        let p3 = b.player(3);
        b.pick(p1, fixture_b, "ARS");
        b.pick(p2, fixture_b, "CHE");
        b.pick(p3, fixture_a, "HOME");

        let plan = build_plan(&b.build());

        assert_eq!(plan.winners(), 1);
        assert_eq!(plan.losers(), 2);
        assert_eq!(plan.processed(), 3);
        assert_eq!(plan.fixtures_to_settle.len(), 2);
        assert_eq!(plan.no_pick_count(), 0);
        // Losers went 3 -> 2 lives; nobody eliminated
        assert_eq!(plan.players_eliminated(), 0);
        assert!(plan.mark_no_pick_processed);
        assert_eq!(plan.active_players_after, 3);
    }

    #[test]
    fn test_settled_round_plans_to_noop() {
        let mut b = SnapshotBuilder::new(3);
        let fixture = b.fixture(Some("ARS"), true);
        let p1 = b.player(2);
        b.pick_with_outcome(p1, fixture, "ARS", Some(PickOutcome::Win));
        let mut snapshot = b.build();
        snapshot.round.no_pick_processed = true;

        let plan = build_plan(&snapshot);

        assert!(plan.is_noop());
        assert_eq!(plan.winners(), 0);
        assert_eq!(plan.losers(), 0);
        assert_eq!(plan.processed(), 0);
        assert_eq!(plan.players_eliminated(), 0);
        assert_eq!(plan.active_players_after, 1);
    }

    #[test]
    fn test_pending_pick_on_settled_fixture_not_touched() {
        // The fixture guard, not the pick guard, gates settlement: a settled
        // fixture contributes nothing even if a pick somehow stayed pending.
        let mut b = SnapshotBuilder::new(3);
        let fixture = b.fixture(Some("ARS"), true);
        let p1 = b.player(2);
        b.pick(p1, fixture, "ARS");
        let mut snapshot = b.build();
        snapshot.round.no_pick_processed = true;

        let plan = build_plan(&snapshot);
        assert!(plan.verdicts.is_empty());
    }

    #[test]
    fn test_unresulted_fixture_defers_no_pick() {
        let mut b = SnapshotBuilder::new(1);
        b.fixture(Some("ARS"), false);
        b.fixture(None, false);
        b.player(1);

        let plan = build_plan(&b.build());

        assert!(!plan.mark_no_pick_processed);
        assert!(plan.no_pick_penalties.is_empty());
    }

    #[test]
    fn test_no_pick_penalty_applied_once_round_fully_resulted() {
        // 5 active players on 1 life, all fixtures resulted, 2 without picks:
        // both lose their last life and go OUT.
        let mut b = SnapshotBuilder::new(1);
        let fixture = b.fixture(Some("ARS"), false);
        let p1 = b.player(1);
        let p2 = b.player(1);
        let p3 = b.player(1);
        let _p4 = b.player(1);
        let _p5 = b.player(1);
        b.pick(p1, fixture, "ARS");
        b.pick(p2, fixture, "ARS");
        b.pick(p3, fixture, "ARS");

        let plan = build_plan(&b.build());

        assert_eq!(plan.no_pick_count(), 2);
        assert!(plan.mark_no_pick_processed);
        assert_eq!(plan.players_eliminated(), 2);
        assert!(plan.no_pick_penalties.iter().all(|p| p.eliminated));
        assert_eq!(plan.active_players_after, 3);
        assert!(!plan.competition_complete());
    }

    #[test]
    fn test_no_pick_flag_set_even_with_no_absentees() {
        let mut b = SnapshotBuilder::new(2);
        let fixture = b.fixture(Some("ARS"), false);
        let p1 = b.player(2);
        b.pick(p1, fixture, "ARS");

        let plan = build_plan(&b.build());

        assert!(plan.mark_no_pick_processed);
        assert!(plan.no_pick_penalties.is_empty());
    }

    #[test]
    fn test_no_pick_skipped_when_already_processed() {
        let mut b = SnapshotBuilder::new(1);
        b.fixture(Some("ARS"), true);
        b.player(1);
        let mut snapshot = b.build();
        snapshot.round.no_pick_processed = true;

        let plan = build_plan(&snapshot);

        assert!(!plan.mark_no_pick_processed);
        assert!(plan.no_pick_penalties.is_empty());
    }

    #[test]
    fn test_lives_clamp_and_elimination() {
        // Two losing picks against a single remaining life: clamped at zero,
        // eliminated exactly once.
        let mut b = SnapshotBuilder::new(1);
        let fixture_a = b.fixture(Some(DRAW), false);
        let fixture_b = b.fixture(Some(DRAW), false);
        let p1 = b.player(1);
        b.pick(p1, fixture_a, "ARS");
        // Second row for the same player on another fixture; the planner
        // aggregates losses before applying them.
        let id = Uuid::new_v4();
        b.snapshot.picks.push(Pick {
            id,
            round_id: b.snapshot.round.id,
            player_id: p1,
            fixture_id: Some(fixture_b),
            team: Some("CHE".to_string()),
            outcome: None,
            created_at: Utc::now(),
        });

        let plan = build_plan(&b.build());

        assert_eq!(plan.losers(), 2);
        let adjustment = &plan.adjustments[0];
        assert_eq!(adjustment.losses, 2);
        assert_eq!(adjustment.lives_after, 0);
        assert!(adjustment.eliminated);
        assert_eq!(plan.players_eliminated(), 1);
    }

    #[test]
    fn test_completion_trigger_single_survivor() {
        // Two active players; one loses their last life this round.
        let mut b = SnapshotBuilder::new(1);
        let fixture = b.fixture(Some("ARS"), false);
        let p1 = b.player(1);
        let p2 = b.player(1);
        b.pick(p1, fixture, "ARS");
        b.pick(p2, fixture, "CHE");

        let plan = build_plan(&b.build());

        assert_eq!(plan.active_players_after, 1);
        assert!(plan.competition_complete());
    }

    #[test]
    fn test_completion_trigger_all_eliminated() {
        let mut b = SnapshotBuilder::new(1);
        let fixture = b.fixture(Some(DRAW), false);
        let p1 = b.player(1);
        let p2 = b.player(1);
        b.pick(p1, fixture, "HOME");
        b.pick(p2, fixture, "AWAY");

        let plan = build_plan(&b.build());

        assert_eq!(plan.active_players_after, 0);
        assert!(plan.competition_complete());
        assert_eq!(plan.players_eliminated(), 2);
    }

    #[test]
    fn test_out_player_pick_settles_without_deduction() {
        // Outcomes are recorded for every pending pick, but an OUT player's
        // lives stay at zero.
        let mut b = SnapshotBuilder::new(1);
        let fixture = b.fixture(Some("ARS"), false);
        let out_player = b.player(0);
        b.pick(out_player, fixture, "CHE");

        let plan = build_plan(&b.build());

        assert_eq!(plan.losers(), 1);
        assert!(plan.adjustments.is_empty());
        assert_eq!(plan.players_eliminated(), 0);
    }

    #[test]
    fn test_second_pass_after_full_settlement_is_noop() {
        // Simulate the post-settlement state of the no-pick scenario and
        // re-plan: every count must be zero.
        let mut b = SnapshotBuilder::new(1);
        let fixture = b.fixture(Some("ARS"), true);
        let p1 = b.player(1);
        b.pick_with_outcome(p1, fixture, "ARS", Some(PickOutcome::Win));
        let p2 = b.player(0);
        let id = Uuid::new_v4();
        b.snapshot.picks.push(Pick {
            id,
            round_id: b.snapshot.round.id,
            player_id: p2,
            fixture_id: None,
            team: None,
            outcome: Some(PickOutcome::NoPick),
            created_at: Utc::now(),
        });
        let mut snapshot = b.build();
        snapshot.round.no_pick_processed = true;

        let plan = build_plan(&snapshot);

        assert!(plan.is_noop());
        assert_eq!(plan.processed(), 0);
        assert_eq!(plan.no_pick_count(), 0);
        assert_eq!(plan.players_eliminated(), 0);
    }
}
