//! Conjunctive filters over the users collection.
//!
//! A [`ClientFilter`] is an immutable list of [`Condition`] fragments joined
//! with `AND`. The same value is evaluated in memory by
//! [`ClientFilter::matches`] and rendered as a PostgreSQL `WHERE` clause by
//! [`ClientFilter::push_where`].

use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime,
    NaiveTime, TimeDelta, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use validator::Validate;

use crate::error::{Result, ServerError};
use crate::user::{Role, User};

/// Window used by the "created recently" counter.
pub const TRAILING_WINDOW_DAYS: i64 = 7;

/// Identifiers are at most this long (`VARCHAR(32)`).
pub const MAX_ID_LENGTH: u64 = 32;

/// Accepted years for `startDate` and `endDate`.
const YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// Time zone in which calendar days are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// Constant offset, from the `timezone` setting.
    Fixed(FixedOffset),
    /// Host time zone. The offset is resolved for each date, so daylight
    /// saving time is honoured.
    Host,
}

impl Zone {
    /// Calendar day of `instant` in this zone.
    pub fn day_of(&self, instant: DateTime<FixedOffset>) -> NaiveDate {
        match self {
            Zone::Fixed(offset) => instant.with_timezone(offset).date_naive(),
            Zone::Host => instant.with_timezone(&Local).date_naive(),
        }
    }

    /// Instant of wall time `local` in this zone.
    ///
    /// An ambiguous wall time resolves to its earliest instant. A skipped
    /// one (host clocks jumping forward) resolves one hour later.
    pub fn to_utc(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Zone::Fixed(offset) => offset
                .from_local_datetime(&local)
                .single()
                .map(|instant| instant.with_timezone(&Utc)),
            Zone::Host => Local
                .from_local_datetime(&local)
                .earliest()
                .or_else(|| {
                    let shifted = local.checked_add_signed(TimeDelta::hours(1))?;
                    Local.from_local_datetime(&shifted).earliest()
                })
                .map(|instant| instant.with_timezone(&Utc)),
        }
    }
}

/// Query string accepted by the client listing.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClientQuery {
    #[validate(length(
        max = MAX_ID_LENGTH,
        message = "Consultor id must be at most 32 characters long."
    ))]
    pub consultor_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// One predicate fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Role(Role),
    Consultor(String),
    /// Inclusive on both ends.
    CreatedBetween {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    CreatedSince(DateTime<Utc>),
}

impl Condition {
    fn matches(&self, user: &User) -> bool {
        match self {
            Condition::Role(role) => user.role == *role,
            Condition::Consultor(id) => {
                user.consultor_id.as_deref() == Some(id.as_str())
            },
            Condition::CreatedBetween { start, end } => {
                user.created_at >= *start && user.created_at <= *end
            },
            Condition::CreatedSince(since) => user.created_at >= *since,
        }
    }

    fn push_sql(&self, query: &mut QueryBuilder<'_, Postgres>, alias: &str) {
        match self {
            Condition::Role(role) => {
                query.push(format!("{alias}.role = ")).push_bind(*role);
            },
            Condition::Consultor(id) => {
                query
                    .push(format!("{alias}.consultor_id = "))
                    .push_bind(id.clone());
            },
            Condition::CreatedBetween { start, end } => {
                query
                    .push(format!("{alias}.created_at BETWEEN "))
                    .push_bind(*start)
                    .push(" AND ")
                    .push_bind(*end);
            },
            Condition::CreatedSince(since) => {
                query
                    .push(format!("{alias}.created_at >= "))
                    .push_bind(*since);
            },
        }
    }
}

/// Filter selecting CLIENT users.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientFilter {
    conditions: Vec<Condition>,
}

impl ClientFilter {
    /// Every client, regardless of assignment.
    pub fn clients() -> Self {
        Self {
            conditions: vec![Condition::Role(Role::Client)],
        }
    }

    /// Restrict to clients owned by `consultor_id`.
    pub fn consultor(mut self, consultor_id: impl Into<String>) -> Self {
        self.conditions
            .push(Condition::Consultor(consultor_id.into()));
        self
    }

    /// Restrict to users created within `[start, end]`.
    pub fn created_between(
        mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        self.conditions
            .push(Condition::CreatedBetween { start, end });
        self
    }

    /// Restrict to users created at or after `since`.
    pub fn created_since(mut self, since: DateTime<Utc>) -> Self {
        self.conditions.push(Condition::CreatedSince(since));
        self
    }

    /// Clients created during the trailing window ending at `now`.
    pub fn recent(now: DateTime<Utc>) -> Self {
        Self::clients()
            .created_since(now - TimeDelta::days(TRAILING_WINDOW_DAYS))
    }

    /// Build the listing filter from optional query parameters.
    ///
    /// Blank strings count as absent; other values are used as sent. The
    /// date range is only applied when both ends are given; days are
    /// interpreted in `zone`.
    pub fn from_query(query: &ClientQuery, zone: Zone) -> Result<Self> {
        let mut filter = Self::clients();

        if let Some(consultor_id) = non_blank(&query.consultor_id) {
            filter = filter.consultor(consultor_id);
        }

        if let (Some(start), Some(end)) =
            (non_blank(&query.start_date), non_blank(&query.end_date))
        {
            let start = parse_day(start, zone)
                .and_then(|day| start_of_day(day, zone))
                .ok_or_else(|| {
                    ServerError::field(
                        "startDate",
                        "Start date must be YYYY-MM-DD or RFC 3339, between years 1 and 9999.",
                    )
                })?;
            let end = parse_day(end, zone)
                .and_then(|day| end_of_day(day, zone))
                .ok_or_else(|| {
                    ServerError::field(
                        "endDate",
                        "End date must be YYYY-MM-DD or RFC 3339, between years 1 and 9999.",
                    )
                })?;

            filter = filter.created_between(start, end);
        }

        Ok(filter)
    }

    /// Fragments composing this filter.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Evaluate against an in-memory user.
    pub fn matches(&self, user: &User) -> bool {
        self.conditions.iter().all(|c| c.matches(user))
    }

    /// Append ` WHERE ...` for table alias `alias`.
    pub fn push_where(&self, query: &mut QueryBuilder<'_, Postgres>, alias: &str) {
        query.push(" WHERE ");
        if self.conditions.is_empty() {
            query.push("TRUE");
            return;
        }

        let mut separated = false;
        for condition in &self.conditions {
            if separated {
                query.push(" AND ");
            }
            condition.push_sql(query, alias);
            separated = true;
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Parse a calendar day, either `YYYY-MM-DD` or a full RFC 3339 timestamp
/// (reduced to its day in `zone`). Years outside 1..=9999 are rejected.
pub fn parse_day(value: &str, zone: Zone) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|instant| zone.day_of(instant))
        })
        .filter(|day| YEARS.contains(&day.year()))
}

/// 00:00:00.000 of `day` in `zone`.
pub fn start_of_day(day: NaiveDate, zone: Zone) -> Option<DateTime<Utc>> {
    zone.to_utc(day.and_time(NaiveTime::MIN))
}

/// 23:59:59.999 of `day` in `zone`.
pub fn end_of_day(day: NaiveDate, zone: Zone) -> Option<DateTime<Utc>> {
    let next = day.succ_opt()?;
    zone.to_utc(next.and_time(NaiveTime::MIN))?
        .checked_sub_signed(TimeDelta::milliseconds(1))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::user::generate_id;

    fn utc() -> Zone {
        Zone::Fixed(FixedOffset::east_opt(0).unwrap())
    }

    fn hours(hours: i32) -> Zone {
        Zone::Fixed(FixedOffset::east_opt(hours * 3600).unwrap())
    }

    fn query(
        consultor: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
    ) -> ClientQuery {
        ClientQuery {
            consultor_id: consultor.map(Into::into),
            start_date: start.map(Into::into),
            end_date: end.map(Into::into),
        }
    }

    fn client(created_at: DateTime<Utc>, consultor: Option<&str>) -> User {
        let mut user = User::builder()
            .name("client")
            .email(format!("{}@example.com", generate_id()))
            .role(Role::Client)
            .build()
            .into_user(generate_id(), created_at);
        user.consultor_id = consultor.map(Into::into);
        user
    }

    #[test]
    fn test_no_parameters_selects_every_client() {
        let filter = ClientFilter::from_query(&ClientQuery::default(), utc()).unwrap();
        assert_eq!(filter.conditions(), &[Condition::Role(Role::Client)]);

        assert!(filter.matches(&client(Utc::now(), None)));
        assert!(filter.matches(&client(Utc::now(), Some("c1"))));

        let mut consultor = client(Utc::now(), None);
        consultor.role = Role::Consultor;
        assert!(!filter.matches(&consultor));
    }

    #[test]
    fn test_empty_consultor_is_ignored() {
        let filter =
            ClientFilter::from_query(&query(Some(""), None, None), utc()).unwrap();
        assert_eq!(filter, ClientFilter::clients());

        let filter =
            ClientFilter::from_query(&query(Some("   "), None, None), utc()).unwrap();
        assert_eq!(filter, ClientFilter::clients());
    }

    #[test]
    fn test_consultor_is_not_trimmed() {
        let filter =
            ClientFilter::from_query(&query(Some(" c1"), None, None), utc()).unwrap();

        assert_eq!(filter.conditions()[1], Condition::Consultor(" c1".into()));
        assert!(!filter.matches(&client(Utc::now(), Some("c1"))));
        assert!(filter.matches(&client(Utc::now(), Some(" c1"))));
    }

    #[test]
    fn test_consultor_restricts_result() {
        let filter =
            ClientFilter::from_query(&query(Some("c1"), None, None), utc()).unwrap();

        assert!(filter.matches(&client(Utc::now(), Some("c1"))));
        assert!(!filter.matches(&client(Utc::now(), Some("c2"))));
        assert!(!filter.matches(&client(Utc::now(), None)));
    }

    #[test]
    fn test_single_date_is_ignored() {
        let neither = ClientFilter::from_query(&ClientQuery::default(), utc()).unwrap();

        for q in [
            query(None, Some("2024-03-01"), None),
            query(None, None, Some("2024-03-01")),
            query(None, Some("2024-03-01"), Some("")),
            // Invalid but lonely dates are never parsed.
            query(None, Some("not a date"), None),
        ] {
            assert_eq!(ClientFilter::from_query(&q, utc()).unwrap(), neither);
        }
    }

    #[test]
    fn test_date_range_is_inclusive_day_bounds() {
        let filter = ClientFilter::from_query(
            &query(None, Some("2024-03-01"), Some("2024-03-05")),
            utc(),
        )
        .unwrap();

        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 5, 23, 59, 59).unwrap()
            + TimeDelta::milliseconds(999);
        assert_eq!(
            filter.conditions()[1],
            Condition::CreatedBetween { start, end }
        );

        assert!(filter.matches(&client(start, None)));
        assert!(filter.matches(&client(end, None)));
        assert!(!filter.matches(&client(start - TimeDelta::milliseconds(1), None)));
        assert!(!filter.matches(&client(end + TimeDelta::milliseconds(1), None)));
    }

    #[test]
    fn test_day_bounds_follow_offset() {
        let sao_paulo = hours(-3);
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        assert_eq!(
            start_of_day(day, sao_paulo),
            Utc.with_ymd_and_hms(2024, 3, 1, 3, 0, 0).single()
        );
        assert_eq!(
            end_of_day(day, sao_paulo),
            Some(
                Utc.with_ymd_and_hms(2024, 3, 2, 2, 59, 59).unwrap()
                    + TimeDelta::milliseconds(999)
            )
        );
    }

    #[test]
    fn test_host_zone_resolves_each_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let start = start_of_day(day, Zone::Host).unwrap();
        let end = end_of_day(day, Zone::Host).unwrap();

        assert!(end > start);
        // A day lasts 23 to 25 hours depending on daylight saving time.
        assert!(end - start >= TimeDelta::hours(23) - TimeDelta::milliseconds(1));
        assert!(end - start < TimeDelta::hours(25));
    }

    #[test]
    fn test_parse_day_accepts_timestamps() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(parse_day("2024-03-01", utc()), Some(day));
        assert_eq!(parse_day("2024-03-01T10:00:00Z", utc()), Some(day));
        // 01:00 UTC is still the previous day three hours west.
        assert_eq!(
            parse_day("2024-03-02T01:00:00Z", hours(-3)),
            Some(day)
        );
        assert_eq!(parse_day(" 2024-03-01 ", utc()), Some(day));
        assert_eq!(parse_day("03/01/2024", utc()), None);
    }

    #[test]
    fn test_out_of_range_years_are_rejected() {
        assert_eq!(parse_day("+262142-12-31", utc()), None);
        assert_eq!(parse_day("-262143-01-01", utc()), None);
        assert_eq!(parse_day("0000-01-01", utc()), None);
        assert!(parse_day("9999-12-31", utc()).is_some());
        assert!(parse_day("0001-01-01", utc()).is_some());

        for zone in [hours(-3), utc(), hours(3), hours(14)] {
            let err = ClientFilter::from_query(
                &query(None, Some("2024-01-01"), Some("+262142-12-31")),
                zone,
            )
            .unwrap_err();
            let ServerError::Validation(errors) = err else {
                panic!("expected a validation error");
            };
            assert!(errors.field_errors().contains_key("endDate"));

            let err = ClientFilter::from_query(
                &query(None, Some("-262143-01-01"), Some("2024-01-01")),
                zone,
            )
            .unwrap_err();
            let ServerError::Validation(errors) = err else {
                panic!("expected a validation error");
            };
            assert!(errors.field_errors().contains_key("startDate"));
        }
    }

    #[test]
    fn test_extreme_supported_days_have_bounds() {
        for zone in [hours(-12), hours(14)] {
            let first = NaiveDate::from_ymd_opt(1, 1, 1).unwrap();
            let last = NaiveDate::from_ymd_opt(9999, 12, 31).unwrap();

            let filter = ClientFilter::from_query(
                &query(None, Some("0001-01-01"), Some("9999-12-31")),
                zone,
            )
            .unwrap();
            assert_eq!(
                filter.conditions()[1],
                Condition::CreatedBetween {
                    start: start_of_day(first, zone).unwrap(),
                    end: end_of_day(last, zone).unwrap(),
                }
            );
        }
    }

    #[test]
    fn test_invalid_date_pair_is_rejected() {
        let err = ClientFilter::from_query(
            &query(None, Some("2024-13-01"), Some("2024-03-05")),
            utc(),
        )
        .unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
    }

    #[test]
    fn test_recent_window() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let filter = ClientFilter::recent(now);

        assert!(filter.matches(&client(now - TimeDelta::days(7), None)));
        assert!(filter.matches(&client(now - TimeDelta::days(1), Some("c1"))));
        assert!(!filter.matches(&client(
            now - TimeDelta::days(7) - TimeDelta::seconds(1),
            None
        )));
    }

    #[test]
    fn test_push_where_renders_every_fragment() {
        let now = Utc::now();
        let filter = ClientFilter::clients()
            .consultor("c1")
            .created_between(now, now);

        let mut query = QueryBuilder::<Postgres>::new("SELECT u.id FROM users u");
        filter.push_where(&mut query, "u");

        assert_eq!(
            query.sql(),
            "SELECT u.id FROM users u WHERE u.role = $1 AND u.consultor_id = $2 \
             AND u.created_at BETWEEN $3 AND $4"
        );
    }
}
