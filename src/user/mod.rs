mod builder;
pub mod filter;
mod memory;
mod postgres;
mod repository;
pub(crate) mod service;

pub use builder::*;
pub use filter::{ClientFilter, ClientQuery, Condition, Zone};
pub use memory::MemoryUserRepository;
pub use postgres::PgUserRepository;
pub use repository::*;
pub use service::*;

use chrono::{DateTime, Utc};
use rand::distributions::{Alphanumeric, DistString};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

const ID_LENGTH: usize = 24;

/// Generate a random user identifier.
pub fn generate_id() -> String {
    Alphanumeric.sample_string(&mut OsRng, ID_LENGTH)
}

/// Kind of account.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Consultor,
    Client,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::Consultor => write!(f, "CONSULTOR"),
            Role::Client => write!(f, "CLIENT"),
        }
    }
}

/// User as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub age: Option<i32>,
    pub address: Option<String>,
    pub role: Role,
    /// Consultor owning this client. Only meaningful for [`Role::Client`].
    pub consultor_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal consultor projection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConsultorSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for ConsultorSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Client joined with its consultor.
///
/// `consultor` is `None` when the client is unassigned or when its
/// `consultor_id` points at a user that no longer exists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    #[serde(flatten)]
    pub user: User,
    pub consultor: Option<ConsultorSummary>,
}

/// Partial update of a [`User`]. `None` leaves the stored value untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub age: Option<i32>,
    pub address: Option<String>,
    pub role: Option<Role>,
}

impl UserPatch {
    /// Apply every supplied field on `user`.
    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            user.phone = Some(phone.clone());
        }
        if let Some(national_id) = &self.national_id {
            user.national_id = Some(national_id.clone());
        }
        if let Some(age) = self.age {
            user.age = Some(age);
        }
        if let Some(address) = &self.address {
            user.address = Some(address.clone());
        }
        if let Some(role) = self.role {
            user.role = role;
        }
    }
}

/// Roster operation executed together with a user write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RosterChange {
    /// Point the listed clients at the consultor, keeping current members.
    Assign(Vec<String>),
    /// Detach every current member, then assign the listed clients.
    Replace(Vec<String>),
}

impl RosterChange {
    /// Clients that end up pointing at the consultor.
    pub fn client_ids(&self) -> &[String] {
        match self {
            RosterChange::Assign(ids) | RosterChange::Replace(ids) => ids,
        }
    }
}
