//! Closed mapping from entity kinds to their tables, plus the generic
//! list/count/delete operations every model shares.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool, sqlite::SqliteRow};
use strum_macros::{Display, EnumIter, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, EnumString, EnumIter, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    User,
    Family,
    UserPreference,
    Activity,
    Suggestion,
    ActivityFavorite,
    Post,
    PostLike,
    Comment,
    Share,
    Notification,
    Invitation,
    FamilyEvent,
    CoNest,
    ChatMessage,
}

impl EntityKind {
    pub const fn table_name(self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::Family => "families",
            EntityKind::UserPreference => "user_preferences",
            EntityKind::Activity => "activities",
            EntityKind::Suggestion => "suggestions",
            EntityKind::ActivityFavorite => "activity_favorites",
            EntityKind::Post => "posts",
            EntityKind::PostLike => "post_likes",
            EntityKind::Comment => "comments",
            EntityKind::Share => "shares",
            EntityKind::Notification => "notifications",
            EntityKind::Invitation => "invitations",
            EntityKind::FamilyEvent => "family_events",
            EntityKind::CoNest => "co_nests",
            EntityKind::ChatMessage => "chat_messages",
        }
    }
}

/// A row type stored in one of the [`EntityKind`] tables.
pub trait Entity: for<'r> FromRow<'r, SqliteRow> + Send + Unpin {
    const KIND: EntityKind;
    /// Column list used for every `SELECT`/`RETURNING` of this entity.
    const COLUMNS: &'static str;
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Uuid(Uuid),
    Text(String),
    Int(i64),
    Bool(bool),
    Null,
}

impl From<Uuid> for FilterValue {
    fn from(value: Uuid) -> Self {
        FilterValue::Uuid(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Equality filters, ordering and limit for a generic list.
///
/// Column names are `&'static str` so they can only come from code, never from a request.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    filters: Vec<(&'static str, FilterValue)>,
    order_by: Option<(&'static str, SortOrder)>,
    limit: Option<i64>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, column: &'static str, value: impl Into<FilterValue>) -> Self {
        self.filters.push((column, value.into()));
        self
    }

    pub fn order_by(mut self, column: &'static str, order: SortOrder) -> Self {
        self.order_by = Some((column, order));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    fn push_where<'a>(&'a self, builder: &mut QueryBuilder<'a, Sqlite>) {
        for (i, (column, value)) in self.filters.iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            builder.push(*column);
            match value {
                FilterValue::Null => {
                    builder.push(" IS NULL");
                }
                FilterValue::Uuid(v) => {
                    builder.push(" = ").push_bind(*v);
                }
                FilterValue::Text(v) => {
                    builder.push(" = ").push_bind(v.as_str());
                }
                FilterValue::Int(v) => {
                    builder.push(" = ").push_bind(*v);
                }
                FilterValue::Bool(v) => {
                    builder.push(" = ").push_bind(*v);
                }
            }
        }
    }
}

pub async fn list<T: Entity>(pool: &SqlitePool, query: &ListQuery) -> Result<Vec<T>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {} FROM {}",
        T::COLUMNS,
        T::KIND.table_name()
    ));
    query.push_where(&mut builder);
    if let Some((column, order)) = query.order_by {
        builder.push(format!(
            " ORDER BY {} {}, rowid {}",
            column,
            order.as_sql(),
            order.as_sql()
        ));
    }
    if let Some(limit) = query.limit {
        builder.push(" LIMIT ").push_bind(limit);
    }
    builder.build_query_as::<T>().fetch_all(pool).await
}

pub async fn find_by_id<T: Entity>(pool: &SqlitePool, id: Uuid) -> Result<Option<T>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = $1",
        T::COLUMNS,
        T::KIND.table_name()
    );
    sqlx::query_as::<_, T>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn count(
    pool: &SqlitePool,
    kind: EntityKind,
    query: &ListQuery,
) -> Result<i64, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", kind.table_name()));
    query.push_where(&mut builder);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub async fn exists(
    pool: &SqlitePool,
    kind: EntityKind,
    query: &ListQuery,
) -> Result<bool, sqlx::Error> {
    Ok(count(pool, kind, query).await? > 0)
}

/// Delete the rows matching `query`. An unfiltered query deletes nothing.
pub async fn delete_where(
    pool: &SqlitePool,
    kind: EntityKind,
    query: &ListQuery,
) -> Result<u64, sqlx::Error> {
    if query.filters.is_empty() {
        return Ok(0);
    }
    let mut builder = QueryBuilder::<Sqlite>::new(format!("DELETE FROM {}", kind.table_name()));
    query.push_where(&mut builder);
    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}

pub async fn delete(pool: &SqlitePool, kind: EntityKind, id: Uuid) -> Result<u64, sqlx::Error> {
    delete_where(pool, kind, &ListQuery::new().filter("id", id)).await
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn every_kind_maps_to_a_distinct_table() {
        let tables: HashSet<_> = EntityKind::iter().map(EntityKind::table_name).collect();
        assert_eq!(tables.len(), EntityKind::iter().count());
    }

    #[test]
    fn kinds_parse_from_snake_case() {
        assert_eq!("post_like".parse::<EntityKind>().unwrap(), EntityKind::PostLike);
        assert_eq!(EntityKind::FamilyEvent.to_string(), "family_event");
        assert!("messages".parse::<EntityKind>().is_err());
    }

    #[test]
    fn where_clause_binds_in_order() {
        let query = ListQuery::new()
            .filter("family_id", Uuid::nil())
            .filter("read_at", FilterValue::Null);
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT 1 FROM users");
        query.push_where(&mut builder);
        assert_eq!(
            builder.sql(),
            "SELECT 1 FROM users WHERE family_id = ? AND read_at IS NULL"
        );
    }
}
