use crate::api_error::ApiError;
use crate::auth::ClaimsExt;
use crate::service::settlement_service::SettlementService;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Application state containing the Settlement Service
pub struct AppState {
    pub settlement_service: Arc<SettlementService>,
}

/// POST /api/rounds/{id}/settle
/// Settle a round: compute pick outcomes from fixture results, deduct
/// lives, apply the no-pick penalty and evaluate completion. Organiser
/// only; safe to retry.
pub async fn settle_round(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    // Reject a malformed id before touching any data
    let round_id = Uuid::parse_str(&path.into_inner())
        .map_err(|_| ApiError::validation("Malformed round id"))?;

    let caller = req.user_id().ok_or(ApiError::Unauthorized)?;

    info!(
        round_id = %round_id,
        caller = %caller,
        "Received settle round request"
    );

    let summary = state
        .settlement_service
        .settle_round(round_id, caller)
        .await?;

    Ok(HttpResponse::Ok().json(summary))
}

/// Configure settlement routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/rounds").route("/{id}/settle", web::post().to(settle_round)),
    );
}
