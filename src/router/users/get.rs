use axum::Json;
use axum::extract::{Path, State};

use super::{IdQuery, UserResponse};
use crate::ServerError;
use crate::router::ValidQuery;
use crate::user::UserService;

async fn fetch(users: &UserService, id: String) -> Result<Json<UserResponse>, ServerError> {
    match users.find(&id).await? {
        Some(user) => Ok(Json(user.into())),
        None => Err(ServerError::UserNotFound { id }),
    }
}

/// `GET /api/users?id=`.
pub async fn handler(
    State(users): State<UserService>,
    ValidQuery(query): ValidQuery<IdQuery>,
) -> Result<Json<UserResponse>, ServerError> {
    fetch(&users, query.required()?).await
}

/// `GET /api/users/{id}`.
pub async fn by_path(
    State(users): State<UserService>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ServerError> {
    fetch(&users, id).await
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::*;

    #[tokio::test]
    async fn test_get_handler() {
        let (state, _clock) = memory_state();
        let app = app(state);

        let response = make_request(
            app.clone(),
            Method::POST,
            "/api/users",
            json!({ "name": "Nina", "email": "nina@example.com", "role": "ADMIN" })
                .to_string(),
        )
        .await;
        let created = body_json(response).await["user"].clone();
        let id = created["id"].as_str().unwrap();

        for path in [format!("/api/users/{id}"), format!("/api/users?id={id}")] {
            let response =
                make_request(app.clone(), Method::GET, &path, String::default())
                    .await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_json(response).await["user"], created);
        }

        let response = make_request(
            app,
            Method::GET,
            "/api/users/unknown",
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
