//! PostgreSQL document store
//!
//! Documents live in the single `documents` table created by
//! [`crate::database::MIGRATIONS`], one JSONB `body` per row. Filters are
//! translated to JSONB operators; read-modify-write updates run inside a
//! transaction holding a row lock.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{error, info};
use uuid::Uuid;

use super::{
    Document, DocumentStore, Filter, FindOptions, Update, apply_updates, prepare_insert,
};
use crate::error::{DatabaseError, StoreError, StoreResult};
use crate::pipeline::SortDirection;

/// Document store over a PostgreSQL pool
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

fn path_array(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Append the SQL for `filter` to the builder
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    match filter {
        Filter::All => {
            builder.push("TRUE");
        }
        Filter::Eq(path, value) => {
            builder
                .push("(body #> ")
                .push_bind(path_array(path))
                .push("::text[] @> ")
                .push_bind(Json(value.clone()))
                .push(")");
        }
        Filter::In(path, values) => {
            if values.is_empty() {
                builder.push("FALSE");
                return;
            }
            builder.push("(");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                builder
                    .push("body #> ")
                    .push_bind(path_array(path))
                    .push("::text[] @> ")
                    .push_bind(Json(value.clone()));
            }
            builder.push(")");
        }
        Filter::Gt(path, bound) => {
            builder
                .push("(CASE WHEN jsonb_typeof(body #> ")
                .push_bind(path_array(path))
                .push("::text[]) = 'number' THEN (body #>> ")
                .push_bind(path_array(path))
                .push("::text[])::double precision > ")
                .push_bind(*bound)
                .push(" ELSE FALSE END)");
        }
        Filter::Exists(path, wanted) => {
            builder
                .push("(COALESCE(body #> ")
                .push_bind(path_array(path))
                .push("::text[], 'null'::jsonb) <> 'null'::jsonb) = ")
                .push_bind(*wanted);
        }
        Filter::Search { fields, query } => {
            if fields.is_empty() {
                builder.push("FALSE");
                return;
            }
            let pattern = escape_like(query);
            builder.push("(");
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                builder
                    .push("(body #>> ")
                    .push_bind(path_array(field))
                    .push("::text[]) ILIKE ")
                    .push_bind(pattern.clone());
            }
            builder.push(")");
        }
        Filter::And(filters) | Filter::Or(filters) => {
            if filters.is_empty() {
                builder.push(if matches!(filter, Filter::And(_)) {
                    "TRUE"
                } else {
                    "FALSE"
                });
                return;
            }
            let joiner = if matches!(filter, Filter::And(_)) {
                " AND "
            } else {
                " OR "
            };
            builder.push("(");
            for (i, inner) in filters.iter().enumerate() {
                if i > 0 {
                    builder.push(joiner);
                }
                push_filter(builder, inner);
            }
            builder.push(")");
        }
    }
}

fn select_builder<'a>(collection: &str, filter: &Filter) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new("SELECT id, body FROM documents WHERE collection = ");
    builder.push_bind(collection.to_string()).push(" AND ");
    push_filter(&mut builder, filter);
    builder
}

/// `ORDER BY`/`OFFSET`/`LIMIT` for a windowed read; missing values sort
/// lowest, ties fall back to insertion order
fn push_window(builder: &mut QueryBuilder<'_, Postgres>, options: &FindOptions) {
    builder.push(" ORDER BY ");
    if let Some((field, direction)) = &options.sort {
        builder.push("body #> ").push_bind(path_array(field)).push(
            match direction {
                SortDirection::Ascending => "::text[] ASC NULLS FIRST, ",
                SortDirection::Descending => "::text[] DESC NULLS LAST, ",
            },
        );
    }
    builder.push("seq");
    if options.skip > 0 {
        builder
            .push(" OFFSET ")
            .push_bind(i64::try_from(options.skip).unwrap_or(i64::MAX));
    }
    if let Some(limit) = options.limit {
        builder
            .push(" LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }
}

fn map_write_error(collection: &str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate {
                collection: collection.to_string(),
                fields: db_err.constraint().unwrap_or("unique index").to_string(),
            };
        }
    }
    error!("Document write to {} failed: {}", collection, err);
    StoreError::Database(DatabaseError::Query(err))
}

fn query_error(err: sqlx::Error) -> StoreError {
    error!("Document query failed: {}", err);
    StoreError::Database(DatabaseError::Query(err))
}

fn body_of(row: &sqlx::postgres::PgRow) -> StoreResult<Document> {
    let Json(body): Json<Value> = row.try_get("body").map_err(query_error)?;
    match body {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!(
            "stored body is not an object: {}",
            other
        ))),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn ensure_unique(&self, collection: &str, fields: &[&str]) -> StoreResult<()> {
        if !is_identifier(collection) || fields.is_empty() || !fields.iter().all(|f| is_identifier(f))
        {
            return Err(StoreError::InvalidDocument(format!(
                "invalid unique index on {} ({})",
                collection,
                fields.join(", ")
            )));
        }

        let name = format!("uniq_{}_{}", collection, fields.join("_"));
        let columns: Vec<String> = fields.iter().map(|f| format!("(body->>'{}')", f)).collect();
        let present: Vec<String> = fields
            .iter()
            .map(|f| format!("(body->>'{}') IS NOT NULL", f))
            .collect();
        let sql = format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON documents ({}) WHERE collection = '{}' AND {}",
            name,
            columns.join(", "),
            collection,
            present.join(" AND ")
        );

        sqlx::query(&sql).execute(&self.pool).await.map_err(|e| {
            error!("Failed to create unique index {}: {}", name, e);
            StoreError::Database(DatabaseError::Migration(format!("{}: {}", name, e)))
        })?;
        info!("Ensured unique index {}", name);
        Ok(())
    }

    async fn insert(&self, collection: &str, mut doc: Document) -> StoreResult<Document> {
        let id = prepare_insert(&mut doc)?;
        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(id)
            .bind(Json(Value::Object(doc.clone())))
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(collection, e))?;
        Ok(doc)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        let mut builder = select_builder(collection, filter);
        builder.push(" ORDER BY seq");
        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;
        rows.iter().map(body_of).collect()
    }

    async fn find_window(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let mut builder = select_builder(collection, filter);
        push_window(&mut builder, options);
        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;
        rows.iter().map(body_of).collect()
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        let mut builder = select_builder(collection, filter);
        builder.push(" ORDER BY seq LIMIT 1");
        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;
        row.as_ref().map(body_of).transpose()
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        updates: &[Update],
    ) -> StoreResult<Option<Document>> {
        let mut tx = self.pool.begin().await.map_err(query_error)?;

        let mut builder = select_builder(collection, filter);
        builder.push(" ORDER BY seq LIMIT 1 FOR UPDATE");
        let Some(row) = builder
            .build()
            .fetch_optional(&mut *tx)
            .await
            .map_err(query_error)?
        else {
            return Ok(None);
        };

        let id: Uuid = row.try_get("id").map_err(query_error)?;
        let mut doc = body_of(&row)?;
        apply_updates(&mut doc, updates)?;

        sqlx::query(
            "UPDATE documents SET body = $1, updated_at = NOW() WHERE collection = $2 AND id = $3",
        )
        .bind(Json(Value::Object(doc.clone())))
        .bind(collection)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(collection, e))?;

        tx.commit().await.map_err(query_error)?;
        Ok(Some(doc))
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        let mut builder = QueryBuilder::new(
            "DELETE FROM documents WHERE seq = (SELECT seq FROM documents WHERE collection = ",
        );
        builder.push_bind(collection.to_string()).push(" AND ");
        push_filter(&mut builder, filter);
        builder.push(" ORDER BY seq LIMIT 1) RETURNING id, body");

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;
        row.as_ref().map(body_of).transpose()
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let mut builder = QueryBuilder::new("DELETE FROM documents WHERE collection = ");
        builder.push_bind(collection.to_string()).push(" AND ");
        push_filter(&mut builder, filter);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(result.rows_affected())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) AS total FROM documents WHERE collection = ");
        builder.push_bind(collection.to_string()).push(" AND ");
        push_filter(&mut builder, filter);

        let row = builder
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)?;
        let total: i64 = row.try_get("total").map_err(query_error)?;
        Ok(total.max(0) as u64)
    }

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(crate::database::health_check(&self.pool).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_sql_uses_binds() {
        let filter = Filter::eq("owner", "u1").and(Filter::search(&["title"], "50%"));
        let builder = select_builder("videos", &filter);
        let sql = builder.sql();
        assert!(sql.starts_with("SELECT id, body FROM documents WHERE collection = $1"));
        assert!(sql.contains("body #> $2::text[] @> $3"));
        assert!(sql.contains("ILIKE $5"));
        assert!(!sql.contains("50%"));
    }

    #[test]
    fn test_empty_in_matches_nothing() {
        let builder = select_builder("likes", &Filter::is_in("video", vec![]));
        assert!(builder.sql().ends_with("FALSE"));
        let builder = select_builder("likes", &Filter::is_in("video", vec![json!("a")]));
        assert!(builder.sql().contains("@>"));
    }

    #[test]
    fn test_window_sql() {
        let mut builder = select_builder("videos", &Filter::All);
        push_window(
            &mut builder,
            &FindOptions {
                sort: Some(("createdAt".to_string(), SortDirection::Descending)),
                skip: 20,
                limit: Some(10),
            },
        );
        let sql = builder.sql();
        assert!(sql.ends_with("ORDER BY body #> $2::text[] DESC NULLS LAST, seq OFFSET $3 LIMIT $4"));

        let mut builder = select_builder("videos", &Filter::All);
        push_window(&mut builder, &FindOptions::default());
        assert!(builder.sql().ends_with("TRUE ORDER BY seq"));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_identifier_check() {
        assert!(is_identifier("likedBy"));
        assert!(!is_identifier("name'); DROP TABLE documents;--"));
        assert!(!is_identifier("1abc"));
    }
}
