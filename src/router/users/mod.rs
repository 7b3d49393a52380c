//! Users-related HTTP API.
pub mod create;
pub mod delete;
pub mod get;
pub mod update;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::ServerError;
use crate::user::User;
use crate::user::filter::MAX_ID_LENGTH;

/// Envelope returned by create, fetch and update.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: User,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            success: true,
            user,
        }
    }
}

/// `?id=` query string.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct IdQuery {
    #[validate(
        required(message = "User id is required."),
        length(max = MAX_ID_LENGTH, message = "User id must be at most 32 characters long."),
        custom(function = "non_blank", message = "User id is required.")
    )]
    pub id: Option<String>,
}

impl IdQuery {
    /// Return the non-blank `id`.
    pub fn required(self) -> Result<String, ServerError> {
        require_id(self.id)
    }
}

pub(super) fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn require_id(id: Option<String>) -> Result<String, ServerError> {
    match id {
        Some(id) if !id.trim().is_empty() => Ok(id),
        _ => Err(ServerError::field("id", "User id is required.")),
    }
}
