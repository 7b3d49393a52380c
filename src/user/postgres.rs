//! PostgreSQL implementation for user repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgQueryResult;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};

use crate::error::{Result, ServerError};
use crate::user::{
    ClientFilter, ClientRecord, ConsultorSummary, Role, RosterChange, User,
    UserPatch, UserRepository,
};

const USER_COLUMNS: &str = "id, name, email, phone, national_id, age, address, \
                            role, consultor_id, created_at, updated_at";

/// Client row joined with its consultor.
#[derive(Debug, FromRow)]
struct ClientRow {
    #[sqlx(flatten)]
    user: User,
    consultor_ref: Option<String>,
    consultor_name: Option<String>,
    consultor_email: Option<String>,
}

impl From<ClientRow> for ClientRecord {
    fn from(row: ClientRow) -> Self {
        let consultor = match (row.consultor_ref, row.consultor_name, row.consultor_email) {
            (Some(id), Some(name), Some(email)) => {
                Some(ConsultorSummary { id, name, email })
            },
            _ => None,
        };

        Self {
            user: row.user,
            consultor,
        }
    }
}

/// PostgreSQL user repository.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new [`PgUserRepository`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Run both roster phases on `conn`.
async fn apply_roster(
    conn: &mut PgConnection,
    consultor_id: &str,
    roster: &RosterChange,
    now: DateTime<Utc>,
) -> Result<u64> {
    if let RosterChange::Replace(_) = roster {
        let cleared: PgQueryResult = sqlx::query(
            r#"UPDATE users SET consultor_id = NULL, updated_at = $2
                WHERE consultor_id = $1"#,
        )
        .bind(consultor_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        tracing::debug!(
            consultor_id,
            cleared = cleared.rows_affected(),
            "roster cleared"
        );
    }

    if roster.client_ids().is_empty() {
        return Ok(0);
    }

    let assigned: PgQueryResult = sqlx::query(
        r#"UPDATE users SET consultor_id = $1, updated_at = $3
            WHERE id = ANY($2) AND role = $4"#,
    )
    .bind(consultor_id)
    .bind(roster.client_ids().to_vec())
    .bind(now)
    .bind(Role::Client)
    .execute(&mut *conn)
    .await?;

    Ok(assigned.rows_affected())
}

#[async_trait]
impl UserRepository for PgUserRepository {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn insert(
        &self,
        user: &User,
        roster: Option<&RosterChange>,
    ) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, User>(&format!(
            r#"INSERT INTO users (
                    id, name, email, phone, national_id, age, address,
                    role, consultor_id, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING {USER_COLUMNS}"#
        ))
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.national_id)
        .bind(user.age)
        .bind(&user.address)
        .bind(user.role)
        .bind(&user.consultor_id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(ServerError::from_write)?;

        if let Some(roster) = roster {
            apply_roster(&mut *tx, &created.id, roster, created.created_at)
                .await?;
        }

        tx.commit().await?;

        Ok(created)
    }

    async fn update(
        &self,
        id: &str,
        patch: &UserPatch,
        client_ids: Option<&[String]>,
        now: DateTime<Utc>,
    ) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        // The row stays locked until commit, so `role` is current.
        let updated = sqlx::query_as::<_, User>(&format!(
            r#"UPDATE users
                SET
                    name = COALESCE($2, name),
                    email = COALESCE($3, email),
                    phone = COALESCE($4, phone),
                    national_id = COALESCE($5, national_id),
                    age = COALESCE($6, age),
                    address = COALESCE($7, address),
                    role = COALESCE($8, role),
                    updated_at = $9
                WHERE id = $1
                RETURNING {USER_COLUMNS}"#
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.email)
        .bind(&patch.phone)
        .bind(&patch.national_id)
        .bind(patch.age)
        .bind(&patch.address)
        .bind(patch.role)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(ServerError::from_write)?
        .ok_or_else(|| ServerError::UserNotFound { id: id.to_owned() })?;

        if let (Role::Consultor, Some(ids)) = (updated.role, client_ids) {
            apply_roster(&mut *tx, id, &RosterChange::Replace(ids.to_vec()), now)
                .await?;
        }

        tx.commit().await?;

        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result: PgQueryResult = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServerError::UserNotFound { id: id.to_owned() });
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_clients(
        &self,
        filter: &ClientFilter,
    ) -> Result<Vec<ClientRecord>> {
        let mut query = QueryBuilder::<Postgres>::new(
            r#"SELECT
                    u.id, u.name, u.email, u.phone, u.national_id, u.age,
                    u.address, u.role, u.consultor_id, u.created_at, u.updated_at,
                    c.id AS consultor_ref,
                    c.name AS consultor_name,
                    c.email AS consultor_email
                FROM users u
                LEFT JOIN users c ON c.id = u.consultor_id"#,
        );
        filter.push_where(&mut query, "u");
        query.push(" ORDER BY u.created_at DESC");

        let rows = query
            .build_query_as::<ClientRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ClientRecord::from).collect())
    }

    async fn count(&self, filter: &ClientFilter) -> Result<i64> {
        let mut query =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users u");
        filter.push_where(&mut query, "u");

        Ok(query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_consultors(&self) -> Result<Vec<ConsultorSummary>> {
        Ok(sqlx::query_as::<_, ConsultorSummary>(
            r#"SELECT id, name, email FROM users WHERE role = $1 ORDER BY name ASC"#,
        )
        .bind(Role::Consultor)
        .fetch_all(&self.pool)
        .await?)
    }
}
