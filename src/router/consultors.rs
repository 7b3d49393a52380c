use axum::Json;
use axum::extract::State;

use crate::ServerError;
use crate::user::{ConsultorSummary, UserService};

/// `GET /api/consultors` and `/api/consultores`, for the consultor picker.
pub async fn handler(
    State(users): State<UserService>,
) -> Result<Json<Vec<ConsultorSummary>>, ServerError> {
    Ok(Json(users.list_consultors().await?))
}
