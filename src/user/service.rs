use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::clock::Clock;
use crate::error::Result;
use crate::user::{
    ClientFilter, ClientQuery, ClientRecord, ConsultorSummary, NewUser, Role,
    RosterChange, User, UserPatch, UserRepository, Zone, generate_id,
};

/// Filtered client list with its unfiltered counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientList {
    pub clients: Vec<ClientRecord>,
    /// Clients created during the trailing seven days.
    #[serde(rename = "totalLast7Days")]
    pub total_last_7_days: i64,
    pub total_clients: i64,
    /// Length of `clients`.
    pub total: usize,
}

/// User manager.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
    zone: Zone,
}

impl FromRef<AppState> for UserService {
    fn from_ref(state: &AppState) -> UserService {
        state.users.clone()
    }
}

impl UserService {
    /// Create a new [`UserService`]. Calendar days in filters are
    /// interpreted in `zone`.
    pub fn new(
        repo: Arc<dyn UserRepository>,
        clock: Arc<dyn Clock>,
        zone: Zone,
    ) -> Self {
        Self { repo, clock, zone }
    }

    /// Storage backend name.
    pub fn backend(&self) -> &'static str {
        self.repo.backend()
    }

    /// Create a user. A consultor created with clients takes them over,
    /// whoever owned them before.
    pub async fn create(&self, new_user: NewUser) -> Result<User> {
        let roster = (new_user.role == Role::Consultor
            && !new_user.client_ids.is_empty())
        .then(|| RosterChange::Assign(new_user.client_ids.clone()));

        let user = new_user.into_user(generate_id(), self.clock.now());
        let user = self.repo.insert(&user, roster.as_ref()).await?;

        metrics::counter!("users_created_total", "role" => user.role.to_string())
            .increment(1);
        if let Some(roster) = &roster {
            metrics::counter!("roster_assignments_total")
                .increment(roster.client_ids().len() as u64);
        }
        tracing::info!(user_id = %user.id, role = %user.role, "user created");

        Ok(user)
    }

    /// Update the supplied fields of user `id`.
    ///
    /// When the user is a consultor after the update and `client_ids` is
    /// given, its roster is replaced by exactly `client_ids`.
    pub async fn update(
        &self,
        id: &str,
        patch: UserPatch,
        client_ids: Option<Vec<String>>,
    ) -> Result<User> {
        let user = self
            .repo
            .update(id, &patch, client_ids.as_deref(), self.clock.now())
            .await?;

        metrics::counter!("users_updated_total").increment(1);
        if let (Role::Consultor, Some(ids)) = (user.role, &client_ids) {
            metrics::counter!("roster_assignments_total")
                .increment(ids.len() as u64);
            tracing::info!(
                user_id = %user.id,
                clients = ids.len(),
                "roster replaced"
            );
        }

        Ok(user)
    }

    /// Delete user `id`. Clients pointing at it keep their reference.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.repo.delete(id).await?;

        metrics::counter!("users_deleted_total").increment(1);
        tracing::info!(user_id = %id, "user deleted");

        Ok(())
    }

    /// Find user `id`.
    pub async fn find(&self, id: &str) -> Result<Option<User>> {
        self.repo.find_by_id(id).await
    }

    /// Clients matching `query`, with counters ignoring `query`.
    pub async fn list_clients(&self, query: &ClientQuery) -> Result<ClientList> {
        let filter = ClientFilter::from_query(query, self.zone)?;
        let now = self.clock.now();

        let clients = self.repo.list_clients(&filter).await?;
        let total_last_7_days =
            self.repo.count(&ClientFilter::recent(now)).await?;
        let total_clients = self.repo.count(&ClientFilter::clients()).await?;

        Ok(ClientList {
            total: clients.len(),
            clients,
            total_last_7_days,
            total_clients,
        })
    }

    /// Every consultor, ascending by name.
    pub async fn list_consultors(&self) -> Result<Vec<ConsultorSummary>> {
        self.repo.list_consultors().await
    }
}
