//! HTTP surface of clientele.
pub mod clients;
pub mod consultors;
pub mod status;
pub mod users;

use axum::Router;
use axum::extract::{FromRequest, FromRequestParts, Json, Query, Request};
use axum::http::request::Parts;
use axum::routing::get;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::{AppState, ServerError};

/// JSON body deserialized then checked with [`Validate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Valid<T>(pub T);

impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}

/// Query string deserialized then checked with [`Validate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        value.validate()?;
        Ok(ValidQuery(value))
    }
}

/// Routes mounted under `/api`.
pub fn api() -> Router<AppState> {
    Router::new()
        // `GET /api/clients` goes to `clients`.
        .route("/clients", get(clients::handler))
        // `GET /api/consultors` goes to `consultors`.
        .route("/consultors", get(consultors::handler))
        .route("/consultores", get(consultors::handler))
        .route(
            "/users",
            get(users::get::handler)
                .post(users::create::handler)
                .put(users::update::handler)
                .delete(users::delete::handler),
        )
        .route(
            "/users/{id}",
            get(users::get::by_path).delete(users::delete::by_path),
        )
}
