//! Partial update of a user, replacing a consultor roster when asked.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{UserResponse, non_blank, require_id};
use crate::ServerError;
use crate::router::Valid;
use crate::user::filter::MAX_ID_LENGTH;
use crate::user::{Role, UserPatch, UserService};

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[validate(
        required(message = "User id is required."),
        length(max = MAX_ID_LENGTH, message = "User id must be at most 32 characters long."),
        custom(function = "non_blank", message = "User id is required.")
    )]
    pub id: Option<String>,
    #[validate(length(min = 1, message = "Name cannot be empty."))]
    pub name: Option<String>,
    #[validate(email(message = "Email must be formatted."))]
    pub email: Option<String>,
    pub role: Option<Role>,
    #[serde(alias = "telefone")]
    pub phone: Option<String>,
    #[serde(alias = "cpf")]
    pub national_id: Option<String>,
    #[serde(alias = "idade")]
    #[validate(range(min = 0, message = "Age cannot be negative."))]
    pub age: Option<i32>,
    #[serde(alias = "endereco")]
    pub address: Option<String>,
    /// Full roster of a consultor. Omit to keep the current one.
    pub client_ids: Option<Vec<String>>,
}

pub async fn handler(
    State(users): State<UserService>,
    Valid(body): Valid<Body>,
) -> Result<Json<UserResponse>, ServerError> {
    let id = require_id(body.id)?;
    let patch = UserPatch {
        name: body.name,
        email: body.email,
        phone: body.phone,
        national_id: body.national_id,
        age: body.age,
        address: body.address,
        role: body.role,
    };

    let user = users.update(&id, patch, body.client_ids).await?;

    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::*;

    async fn create(app: &Router, body: Value) -> Value {
        let response =
            make_request(app.clone(), Method::POST, "/api/users", body.to_string())
                .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["user"].clone()
    }

    async fn roster(app: &Router, consultor_id: &Value) -> Vec<String> {
        let consultor_id = consultor_id.as_str().unwrap();
        let response = make_request(
            app.clone(),
            Method::GET,
            &format!("/api/clients?consultorId={consultor_id}"),
            String::default(),
        )
        .await;
        let mut names: Vec<String> = body_json(response).await["clients"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap().to_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_reassignment_between_consultors() {
        let (state, clock) = memory_state();
        let app = app(state);

        let c1 = create(
            &app,
            json!({ "name": "C1", "email": "c1@example.com", "role": "CLIENT" }),
        )
        .await;
        let c2 = create(
            &app,
            json!({ "name": "C2", "email": "c2@example.com", "role": "CLIENT" }),
        )
        .await;
        let c3 = create(
            &app,
            json!({ "name": "C3", "email": "c3@example.com", "role": "CLIENT" }),
        )
        .await;

        let a = create(
            &app,
            json!({
                "name": "A",
                "email": "a@example.com",
                "role": "CONSULTOR",
                "clientIds": [c1["id"], c2["id"]],
            }),
        )
        .await;
        let b = create(
            &app,
            json!({
                "name": "B",
                "email": "b@example.com",
                "role": "CONSULTOR",
                "clientIds": [c2["id"]],
            }),
        )
        .await;

        assert_eq!(roster(&app, &a["id"]).await, ["C1"]);
        assert_eq!(roster(&app, &b["id"]).await, ["C2"]);

        clock.advance(chrono::TimeDelta::minutes(1));
        let response = make_request(
            app.clone(),
            Method::PUT,
            "/api/users",
            json!({ "id": a["id"], "clientIds": [c3["id"]] }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["name"], "A");

        assert_eq!(roster(&app, &a["id"]).await, ["C3"]);
        assert_eq!(roster(&app, &b["id"]).await, ["C2"]);

        let response = make_request(
            app.clone(),
            Method::GET,
            "/api/clients",
            String::default(),
        )
        .await;
        let body = body_json(response).await;
        let c1 = body["clients"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["name"] == "C1")
            .unwrap();
        assert_eq!(c1["consultorId"], Value::Null);
        assert_eq!(c1["consultor"], Value::Null);
    }

    #[tokio::test]
    async fn test_update_keeps_absent_fields() {
        let (state, _clock) = memory_state();
        let app = app(state);

        let user = create(
            &app,
            json!({
                "name": "Helena",
                "email": "helena@example.com",
                "role": "CLIENT",
                "phone": "1234",
            }),
        )
        .await;

        let response = make_request(
            app,
            Method::PUT,
            "/api/users",
            json!({ "id": user["id"], "idade": 30, "phone": null }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let updated = &body_json(response).await["user"];
        assert_eq!(updated["age"], 30);
        assert_eq!(updated["phone"], "1234");
        assert_eq!(updated["name"], "Helena");
        assert_eq!(updated["createdAt"], user["createdAt"]);
        assert_ne!(updated["updatedAt"], user["updatedAt"]);
    }

    #[tokio::test]
    async fn test_update_errors() {
        let (state, _clock) = memory_state();
        let app = app(state);

        let response = make_request(
            app.clone(),
            Method::PUT,
            "/api/users",
            json!({ "name": "Nobody" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["errors"][0]["field"], "id");

        let response = make_request(
            app.clone(),
            Method::PUT,
            "/api/users",
            json!({ "id": "   ", "name": "Nobody" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = make_request(
            app.clone(),
            Method::PUT,
            "/api/users",
            json!({ "id": "missing", "name": "Nobody" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        create(
            &app,
            json!({ "name": "Ivo", "email": "ivo@example.com", "role": "CLIENT" }),
        )
        .await;
        let jade = create(
            &app,
            json!({ "name": "Jade", "email": "jade@example.com", "role": "CLIENT" }),
        )
        .await;

        let response = make_request(
            app,
            Method::PUT,
            "/api/users",
            json!({ "id": jade["id"], "email": "ivo@example.com" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
