//! Create a user, optionally taking over a roster of clients.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::UserResponse;
use crate::ServerError;
use crate::router::Valid;
use crate::user::{Role, User, UserService};

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[validate(
        required(message = "Name is required."),
        length(min = 1, message = "Name is required.")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "Email is required."),
        email(message = "Email must be formatted.")
    )]
    pub email: Option<String>,
    #[validate(required(message = "Role is required."))]
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
    pub client_ids: Option<Vec<String>>,
}

pub async fn handler(
    State(users): State<UserService>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<UserResponse>), ServerError> {
    let name = body
        .name
        .ok_or_else(|| ServerError::field("name", "Name is required."))?;
    let email = body
        .email
        .ok_or_else(|| ServerError::field("email", "Email is required."))?;
    let role = body
        .role
        .ok_or_else(|| ServerError::field("role", "Role is required."))?;

    let new_user = User::builder()
        .name(name)
        .email(email)
        .role(role)
        .phone(body.phone)
        .national_id(body.national_id)
        .age(body.age)
        .address(body.address)
        .client_ids(body.client_ids.unwrap_or_default())
        .build();

    let user = users.create(new_user).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}
