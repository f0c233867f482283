use sqlx::PgConnection;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api_error::ApiError;
use crate::db::DbPool;
use crate::models::competition::{Competition, CompetitionPlayer};
use crate::models::pick::Pick;
use crate::models::round::{Fixture, Round};
use crate::models::settlement::SettlementSummary;
use crate::service::audit_service;
use crate::service::completion_service;
use crate::service::settlement_plan::{build_plan, RoundSnapshot, SettlementPlan};

/// Round Settlement Engine. Converts fixture results into pick outcomes,
/// life deductions, eliminations and the no-pick penalty, exactly once per
/// round, inside a single transaction serialized on the round row.
#[derive(Clone)]
pub struct SettlementService {
    pool: DbPool,
}

impl SettlementService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Settle a round on behalf of `caller`. The caller must be the owning
    /// competition's organiser. Settling an already-settled round is a
    /// valid no-op returning zero counts.
    pub async fn settle_round(
        &self,
        round_id: Uuid,
        caller: Uuid,
    ) -> Result<SettlementSummary, ApiError> {
        let mut tx = self.pool.begin().await?;

        // The round lock is the serialization point: two concurrent calls
        // for the same round queue here, and the second observes the
        // settled state left by the first.
        let round = lock_round(&mut *tx, round_id)
            .await?
            .ok_or(ApiError::RoundNotFound)?;

        let competition = load_competition(&mut *tx, round.competition_id).await?;
        if !competition.is_organiser(caller) {
            warn!(
                round_id = %round_id,
                caller = %caller,
                "Settlement rejected: caller is not the organiser"
            );
            return Err(ApiError::Unauthorized);
        }

        info!(
            round_id = %round_id,
            competition_id = %competition.id,
            round_number = round.round_number,
            "Settling round"
        );

        let snapshot = load_snapshot(&mut *tx, competition, round).await?;
        let plan = build_plan(&snapshot);
        debug!(
            round_id = %round_id,
            verdicts = plan.verdicts.len(),
            fixtures = plan.fixtures_to_settle.len(),
            no_picks = plan.no_pick_penalties.len(),
            "Settlement plan built"
        );

        apply_plan(&mut *tx, &snapshot, &plan).await?;

        let completion =
            completion_service::evaluate_completion(&mut *tx, snapshot.competition.id).await?;

        let total_picks: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM picks WHERE round_id = $1",
        )
        .bind(round_id)
        .fetch_one(&mut *tx)
        .await?;

        let summary = SettlementSummary {
            winners: plan.winners(),
            losers: plan.losers(),
            processed: plan.processed(),
            players_eliminated: plan.players_eliminated(),
            no_pick_processed: plan.no_pick_count(),
            total: total_picks,
            active_players: completion.active_players,
            competition_complete: completion.complete,
        };

        if !plan.is_noop() {
            audit_service::record_settlement(&mut *tx, snapshot.competition.id, round_id, &summary)
                .await?;
        }
        if completion.newly_complete {
            if let Some(cause) = completion.cause {
                audit_service::record_completion(&mut *tx, snapshot.competition.id, round_id, cause)
                    .await?;
            }
        }

        tx.commit().await?;

        info!(
            round_id = %round_id,
            winners = summary.winners,
            losers = summary.losers,
            eliminated = summary.players_eliminated,
            no_picks = summary.no_pick_processed,
            complete = summary.competition_complete,
            "Round settled"
        );

        Ok(summary)
    }
}

async fn lock_round(
    conn: &mut PgConnection,
    round_id: Uuid,
) -> Result<Option<Round>, ApiError> {
    let round = sqlx::query_as::<_, Round>(
        r#"
        SELECT id, competition_id, round_number, no_pick_processed, created_at
        FROM rounds
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(round_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(round)
}

async fn load_competition(
    conn: &mut PgConnection,
    competition_id: Uuid,
) -> Result<Competition, ApiError> {
    let competition = sqlx::query_as::<_, Competition>(
        r#"
        SELECT id, name, organiser_id, lives_per_player, status, created_at, updated_at
        FROM competitions
        WHERE id = $1
        "#,
    )
    .bind(competition_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(competition)
}

async fn load_snapshot(
    conn: &mut PgConnection,
    competition: Competition,
    round: Round,
) -> Result<RoundSnapshot, ApiError> {
    let fixtures = sqlx::query_as::<_, Fixture>(
        r#"
        SELECT id, round_id, home_team, away_team, result, processed, created_at
        FROM fixtures
        WHERE round_id = $1
        ORDER BY created_at, id
        "#,
    )
    .bind(round.id)
    .fetch_all(&mut *conn)
    .await?;

    let picks = sqlx::query_as::<_, Pick>(
        r#"
        SELECT id, round_id, player_id, fixture_id, team, outcome, created_at
        FROM picks
        WHERE round_id = $1
        "#,
    )
    .bind(round.id)
    .fetch_all(&mut *conn)
    .await?;

    let players = sqlx::query_as::<_, CompetitionPlayer>(
        r#"
        SELECT competition_id, player_id, lives_remaining, status, joined_at
        FROM competition_players
        WHERE competition_id = $1
        FOR UPDATE
        "#,
    )
    .bind(competition.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(RoundSnapshot {
        competition,
        round,
        fixtures,
        picks,
        players,
    })
}

/// Apply a plan with guarded, set-based statements. Each statement keeps its
/// per-row guard (`outcome IS NULL`, `processed IS NULL`, the ACTIVE status
/// filter, the `no_pick_processed = FALSE` compare-and-set), so every write
/// is a strict no-op against rows already in their settled state.
async fn apply_plan(
    conn: &mut PgConnection,
    snapshot: &RoundSnapshot,
    plan: &SettlementPlan,
) -> Result<(), ApiError> {
    let win_ids = plan.win_pick_ids();
    let lose_ids = plan.lose_pick_ids();

    if !win_ids.is_empty() {
        sqlx::query(
            r#"
            UPDATE picks
            SET outcome = 'WIN'::pick_outcome
            WHERE id = ANY($1) AND outcome IS NULL
            "#,
        )
        .bind(win_ids.as_slice())
        .execute(&mut *conn)
        .await?;
    }

    if !lose_ids.is_empty() {
        sqlx::query(
            r#"
            UPDATE picks
            SET outcome = 'LOSE'::pick_outcome
            WHERE id = ANY($1) AND outcome IS NULL
            "#,
        )
        .bind(lose_ids.as_slice())
        .execute(&mut *conn)
        .await?;

        // One set-based deduction over this pass's LOSE picks, clamped at
        // zero with OUT-on-zero. Only ACTIVE players are touched.
        sqlx::query(
            r#"
            UPDATE competition_players cp
            SET lives_remaining = GREATEST(cp.lives_remaining - l.losses, 0),
                status = CASE
                    WHEN cp.lives_remaining - l.losses <= 0 THEN 'OUT'::player_status
                    ELSE cp.status
                END
            FROM (
                SELECT player_id, COUNT(*)::int AS losses
                FROM picks
                WHERE id = ANY($2)
                GROUP BY player_id
            ) l
            WHERE cp.competition_id = $1
              AND cp.player_id = l.player_id
              AND cp.status = 'ACTIVE'::player_status
            "#,
        )
        .bind(snapshot.competition.id)
        .bind(lose_ids.as_slice())
        .execute(&mut *conn)
        .await?;
    }

    if !plan.fixtures_to_settle.is_empty() {
        sqlx::query(
            r#"
            UPDATE fixtures
            SET processed = NOW()
            WHERE id = ANY($1) AND processed IS NULL
            "#,
        )
        .bind(plan.fixtures_to_settle.as_slice())
        .execute(&mut *conn)
        .await?;
    }

    if plan.mark_no_pick_processed {
        apply_no_pick_penalty(conn, snapshot, plan).await?;
    }

    let settled_ids = plan.settled_pick_ids();
    audit_service::append_pick_history(conn, snapshot.competition.id, &settled_ids).await?;

    Ok(())
}

/// Phase 5: synthetic NO_PICK rows, history snapshots and the one-life
/// deduction for active players who submitted nothing, then the
/// compare-and-set on the round flag. Runs only when every fixture in the
/// round carries a result and the flag is still unset.
async fn apply_no_pick_penalty(
    conn: &mut PgConnection,
    snapshot: &RoundSnapshot,
    plan: &SettlementPlan,
) -> Result<(), ApiError> {
    let round_id = snapshot.round.id;
    let competition_id = snapshot.competition.id;

    let penalized: Vec<Uuid> = plan.no_pick_penalties.iter().map(|p| p.player_id).collect();
    for player_id in &penalized {
        sqlx::query(
            r#"
            INSERT INTO picks (id, round_id, player_id, fixture_id, team, outcome)
            VALUES ($1, $2, $3, NULL, NULL, 'NO_PICK'::pick_outcome)
            ON CONFLICT (round_id, player_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(round_id)
        .bind(*player_id)
        .execute(&mut *conn)
        .await?;

        audit_service::append_no_pick_history(conn, competition_id, round_id, *player_id).await?;
    }

    if !penalized.is_empty() {
        sqlx::query(
            r#"
            UPDATE competition_players
            SET lives_remaining = GREATEST(lives_remaining - 1, 0),
                status = CASE
                    WHEN lives_remaining - 1 <= 0 THEN 'OUT'::player_status
                    ELSE status
                END
            WHERE competition_id = $1
              AND player_id = ANY($2)
              AND status = 'ACTIVE'::player_status
            "#,
        )
        .bind(competition_id)
        .bind(penalized.as_slice())
        .execute(&mut *conn)
        .await?;
    }

    // Unconditional even with zero penalties: once every fixture is
    // resulted, no later pass may re-enter this phase.
    let flagged = sqlx::query(
        r#"
        UPDATE rounds
        SET no_pick_processed = TRUE
        WHERE id = $1 AND no_pick_processed = FALSE
        "#,
    )
    .bind(round_id)
    .execute(&mut *conn)
    .await?;

    if flagged.rows_affected() == 0 {
        warn!(
            round_id = %round_id,
            "No-pick flag already set; penalty skipped by compare-and-set"
        );
    }

    Ok(())
}
