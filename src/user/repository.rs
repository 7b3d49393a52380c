//! Storage port for users.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::user::{
    ClientFilter, ClientRecord, ConsultorSummary, RosterChange, User,
    UserPatch,
};

/// Port for user persistence.
///
/// Write operations carrying a roster must apply the user write and the
/// roster change atomically.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Short name of the backend, shown on `/status.json`.
    fn backend(&self) -> &'static str;

    /// Insert `user`, then apply `roster` with `user.id` as consultor.
    async fn insert(&self, user: &User, roster: Option<&RosterChange>)
    -> Result<User>;

    /// Apply `patch` on user `id`. When `client_ids` is given and the
    /// patched user is a consultor, its roster is replaced by `client_ids`
    /// within the same write, so the role deciding it cannot go stale.
    /// Fails with `UserNotFound` when `id` does not exist.
    async fn update(
        &self,
        id: &str,
        patch: &UserPatch,
        client_ids: Option<&[String]>,
        now: DateTime<Utc>,
    ) -> Result<User>;

    /// Hard delete. References held by clients are left untouched.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Find a user by `id`.
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;

    /// Users matching `filter` joined with their consultor, most recently
    /// created first.
    async fn list_clients(&self, filter: &ClientFilter)
    -> Result<Vec<ClientRecord>>;

    /// Number of users matching `filter`.
    async fn count(&self, filter: &ClientFilter) -> Result<i64>;

    /// Every consultor, ascending by name.
    async fn list_consultors(&self) -> Result<Vec<ConsultorSummary>>;
}
