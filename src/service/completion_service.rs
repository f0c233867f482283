use sqlx::PgConnection;
use tracing::info;
use uuid::Uuid;

use crate::api_error::ApiError;
use crate::models::settlement::{CompletionCause, CompletionOutcome};

/// Count players still ACTIVE in the competition and flip it to COMPLETE
/// when one or none remain. Runs on the settlement transaction, after life
/// deduction and the no-pick penalty, since either can eliminate the last
/// remaining players. The status guard keeps OPEN -> COMPLETE
/// one-directional and makes re-evaluation a no-op.
pub async fn evaluate_completion(
    conn: &mut PgConnection,
    competition_id: Uuid,
) -> Result<CompletionOutcome, ApiError> {
    let active_players: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM competition_players
        WHERE competition_id = $1 AND status = 'ACTIVE'::player_status
        "#,
    )
    .bind(competition_id)
    .fetch_one(&mut *conn)
    .await?;

    if active_players > 1 {
        return Ok(CompletionOutcome {
            complete: false,
            cause: None,
            active_players,
            newly_complete: false,
        });
    }

    let cause = if active_players == 0 {
        CompletionCause::AllEliminated
    } else {
        CompletionCause::SingleSurvivor
    };

    let updated = sqlx::query(
        r#"
        UPDATE competitions
        SET status = 'COMPLETE'::competition_status, updated_at = NOW()
        WHERE id = $1 AND status <> 'COMPLETE'::competition_status
        "#,
    )
    .bind(competition_id)
    .execute(&mut *conn)
    .await?;

    let newly_complete = updated.rows_affected() > 0;
    if newly_complete {
        info!(
            competition_id = %competition_id,
            cause = %cause,
            "Competition complete"
        );
    }

    Ok(CompletionOutcome {
        complete: true,
        cause: Some(cause),
        active_players,
        newly_complete,
    })
}
