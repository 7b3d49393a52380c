//! Client listing for the dashboard.

use axum::Json;
use axum::extract::State;

use crate::ServerError;
use crate::router::ValidQuery;
use crate::user::{ClientList, ClientQuery, UserService};

/// `GET /api/clients?consultorId=&startDate=&endDate=`.
pub async fn handler(
    State(users): State<UserService>,
    ValidQuery(query): ValidQuery<ClientQuery>,
) -> Result<Json<ClientList>, ServerError> {
    Ok(Json(users.list_clients(&query).await?))
}
