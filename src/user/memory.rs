//! In-memory user store.
//!
//! Every write takes the lock once, so a user write and its roster change
//! are observed together or not at all.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{Result, ServerError};
use crate::user::{
    ClientFilter, ClientRecord, ConsultorSummary, Role, RosterChange, User,
    UserPatch, UserRepository,
};

/// Users kept in a process-local map.
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(users: &HashMap<String, User>, email: &str, except: &str) -> bool {
    users.values().any(|u| u.email == email && u.id != except)
}

fn apply_roster(
    users: &mut HashMap<String, User>,
    consultor_id: &str,
    roster: &RosterChange,
    now: DateTime<Utc>,
) {
    if let RosterChange::Replace(_) = roster {
        for user in users.values_mut() {
            if user.consultor_id.as_deref() == Some(consultor_id) {
                user.consultor_id = None;
                user.updated_at = now;
            }
        }
    }

    for id in roster.client_ids() {
        if let Some(user) = users.get_mut(id).filter(|u| u.role == Role::Client) {
            user.consultor_id = Some(consultor_id.to_owned());
            user.updated_at = now;
        }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert(
        &self,
        user: &User,
        roster: Option<&RosterChange>,
    ) -> Result<User> {
        let mut users = self.users.write().await;

        if email_taken(&users, &user.email, &user.id) {
            return Err(ServerError::DuplicateEmail);
        }

        users.insert(user.id.clone(), user.clone());
        if let Some(roster) = roster {
            apply_roster(&mut users, &user.id, roster, user.created_at);
        }

        Ok(user.clone())
    }

    async fn update(
        &self,
        id: &str,
        patch: &UserPatch,
        client_ids: Option<&[String]>,
        now: DateTime<Utc>,
    ) -> Result<User> {
        let mut users = self.users.write().await;

        let mut user = users
            .get(id)
            .cloned()
            .ok_or_else(|| ServerError::UserNotFound { id: id.to_owned() })?;
        patch.apply(&mut user);
        user.updated_at = now;

        if email_taken(&users, &user.email, id) {
            return Err(ServerError::DuplicateEmail);
        }

        let role = user.role;
        users.insert(id.to_owned(), user);
        if let (Role::Consultor, Some(ids)) = (role, client_ids) {
            apply_roster(&mut users, id, &RosterChange::Replace(ids.to_vec()), now);
        }

        users
            .get(id)
            .cloned()
            .ok_or_else(|| ServerError::UserNotFound { id: id.to_owned() })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.users.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(ServerError::UserNotFound { id: id.to_owned() }),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn list_clients(
        &self,
        filter: &ClientFilter,
    ) -> Result<Vec<ClientRecord>> {
        let users = self.users.read().await;

        let mut clients: Vec<ClientRecord> = users
            .values()
            .filter(|u| filter.matches(u))
            .map(|u| ClientRecord {
                consultor: u
                    .consultor_id
                    .as_deref()
                    .and_then(|id| users.get(id))
                    .map(ConsultorSummary::from),
                user: u.clone(),
            })
            .collect();
        clients.sort_by(|a, b| b.user.created_at.cmp(&a.user.created_at));

        Ok(clients)
    }

    async fn count(&self, filter: &ClientFilter) -> Result<i64> {
        let users = self.users.read().await;
        let count = users.values().filter(|u| filter.matches(u)).count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn list_consultors(&self) -> Result<Vec<ConsultorSummary>> {
        let users = self.users.read().await;

        let mut consultors: Vec<ConsultorSummary> = users
            .values()
            .filter(|u| u.role == Role::Consultor)
            .map(ConsultorSummary::from)
            .collect();
        consultors.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(consultors)
    }
}
