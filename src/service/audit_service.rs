use sqlx::PgConnection;
use uuid::Uuid;

use crate::api_error::ApiError;
use crate::models::settlement::{CompletionCause, SettlementSummary};

/// Append-only recorder for what a settlement pass did: human-readable
/// audit entries plus per-(player, round) progress snapshots. Everything
/// here runs on the caller's transaction and commits or rolls back with it.

/// Snapshot team and outcome for the picks settled this pass.
/// Insert-if-absent, so a rerun never duplicates a row.
pub async fn append_pick_history(
    conn: &mut PgConnection,
    competition_id: Uuid,
    pick_ids: &[Uuid],
) -> Result<u64, ApiError> {
    if pick_ids.is_empty() {
        return Ok(0);
    }
    let inserted = sqlx::query(
        r#"
        INSERT INTO round_history (competition_id, round_id, player_id, team, outcome)
        SELECT $1, p.round_id, p.player_id, p.team, p.outcome
        FROM picks p
        WHERE p.id = ANY($2) AND p.outcome IS NOT NULL
        ON CONFLICT (round_id, player_id) DO NOTHING
        "#,
    )
    .bind(competition_id)
    .bind(pick_ids)
    .execute(&mut *conn)
    .await?;
    Ok(inserted.rows_affected())
}

/// Snapshot a no-pick penalty for one player.
pub async fn append_no_pick_history(
    conn: &mut PgConnection,
    competition_id: Uuid,
    round_id: Uuid,
    player_id: Uuid,
) -> Result<(), ApiError> {
    sqlx::query(
        r#"
        INSERT INTO round_history (competition_id, round_id, player_id, team, outcome)
        VALUES ($1, $2, $3, NULL, 'NO_PICK'::pick_outcome)
        ON CONFLICT (round_id, player_id) DO NOTHING
        "#,
    )
    .bind(competition_id)
    .bind(round_id)
    .bind(player_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// One audit entry per settlement pass that changed anything, carrying the
/// aggregate counts.
pub async fn record_settlement(
    conn: &mut PgConnection,
    competition_id: Uuid,
    round_id: Uuid,
    summary: &SettlementSummary,
) -> Result<(), ApiError> {
    let detail = serde_json::to_value(summary)
        .map_err(|e| ApiError::internal(format!("Failed to encode audit detail: {}", e)))?;
    sqlx::query(
        r#"
        INSERT INTO audit_log (competition_id, round_id, action, detail)
        VALUES ($1, $2, 'round_settled', $3)
        "#,
    )
    .bind(competition_id)
    .bind(round_id)
    .bind(detail)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Second entry written on the pass that completed the competition, naming
/// the cause.
pub async fn record_completion(
    conn: &mut PgConnection,
    competition_id: Uuid,
    round_id: Uuid,
    cause: CompletionCause,
) -> Result<(), ApiError> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (competition_id, round_id, action, detail)
        VALUES ($1, $2, 'competition_completed', $3)
        "#,
    )
    .bind(competition_id)
    .bind(round_id)
    .bind(serde_json::json!({ "cause": cause.to_string() }))
    .execute(&mut *conn)
    .await?;
    Ok(())
}
