//! Hard delete of a user.

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use super::IdQuery;
use crate::ServerError;
use crate::router::ValidQuery;
use crate::user::UserService;

#[derive(Debug, Serialize, Deserialize)]
pub struct Deleted {
    pub success: bool,
    pub message: String,
}

async fn remove(users: &UserService, id: &str) -> Result<Json<Deleted>, ServerError> {
    users.delete(id).await?;

    Ok(Json(Deleted {
        success: true,
        message: "User deleted.".to_owned(),
    }))
}

/// `DELETE /api/users?id=`.
pub async fn handler(
    State(users): State<UserService>,
    ValidQuery(query): ValidQuery<IdQuery>,
) -> Result<Json<Deleted>, ServerError> {
    let id = query.required()?;
    remove(&users, &id).await
}

/// `DELETE /api/users/{id}`.
pub async fn by_path(
    State(users): State<UserService>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ServerError> {
    remove(&users, &id).await
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::*;

    #[tokio::test]
    async fn test_delete_handler() {
        let (state, _clock) = memory_state();
        let app = app(state);

        let response = make_request(
            app.clone(),
            Method::POST,
            "/api/users",
            json!({ "name": "Kai", "email": "kai@example.com", "role": "CLIENT" })
                .to_string(),
        )
        .await;
        let id = body_json(response).await["user"]["id"]
            .as_str()
            .unwrap()
            .to_owned();

        let response = make_request(
            app.clone(),
            Method::DELETE,
            &format!("/api/users?id={id}"),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "success": true, "message": "User deleted." })
        );

        let response = make_request(
            app,
            Method::DELETE,
            &format!("/api/users/{id}"),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_requires_id() {
        let (state, _clock) = memory_state();
        let app = app(state);

        for path in ["/api/users", "/api/users?id=", "/api/users?id=%20"] {
            let response =
                make_request(app.clone(), Method::DELETE, path, String::default())
                    .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
        }
    }

    #[tokio::test]
    async fn test_deleted_consultor_leaves_dangling_reference() {
        let (state, _clock) = memory_state();
        let app = app(state);

        let response = make_request(
            app.clone(),
            Method::POST,
            "/api/users",
            json!({ "name": "Lia", "email": "lia@example.com", "role": "CLIENT" })
                .to_string(),
        )
        .await;
        let client = body_json(response).await["user"].clone();

        let response = make_request(
            app.clone(),
            Method::POST,
            "/api/users",
            json!({
                "name": "Mauro",
                "email": "mauro@example.com",
                "role": "CONSULTOR",
                "clientIds": [client["id"]],
            })
            .to_string(),
        )
        .await;
        let consultor = body_json(response).await["user"].clone();
        let consultor_id = consultor["id"].as_str().unwrap();

        let response = make_request(
            app.clone(),
            Method::DELETE,
            &format!("/api/users/{consultor_id}"),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = make_request(
            app,
            Method::GET,
            &format!("/api/clients?consultorId={consultor_id}"),
            String::default(),
        )
        .await;
        let body = body_json(response).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["clients"][0]["consultorId"], consultor["id"]);
        assert_eq!(body["clients"][0]["consultor"], Value::Null);
    }
}
