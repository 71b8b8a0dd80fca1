//! Document store abstraction
//!
//! Entities are stored as JSON documents grouped in named collections. Every
//! document carries a UUID `_id` plus `createdAt`/`updatedAt` timestamps. The
//! [`DocumentStore`] trait is implemented by a PostgreSQL/JSONB backend and by
//! an in-memory backend used in tests and local runs.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::path::{compare_values, get_path, remove_path, set_path, values_at, values_equal};
use crate::pipeline::SortDirection;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

/// A stored JSON object
pub type Document = Map<String, Value>;

/// Field holding the document id
pub const ID_FIELD: &str = "_id";
/// Creation timestamp field
pub const CREATED_AT: &str = "createdAt";
/// Last modification timestamp field
pub const UPDATED_AT: &str = "updatedAt";

/// Predicate over documents
///
/// Paths are dotted. A path that resolves to an array matches when any
/// element matches, so `Eq("videos", id)` selects playlists containing `id`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every document
    All,
    /// Value at path equals (or array at path contains) the given value
    Eq(String, Value),
    /// Value at path is one of the given values
    In(String, Vec<Value>),
    /// Numeric value at path is strictly greater
    Gt(String, f64),
    /// Path is present and non-null (`true`) or absent/null (`false`)
    Exists(String, bool),
    /// Case-insensitive substring match on any of the fields
    Search { fields: Vec<String>, query: String },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(path.into(), value.into())
    }

    /// Match a document by its `_id`
    pub fn id(id: Uuid) -> Self {
        Filter::Eq(ID_FIELD.to_string(), Value::String(id.to_string()))
    }

    pub fn is_in(path: impl Into<String>, values: Vec<Value>) -> Self {
        Filter::In(path.into(), values)
    }

    pub fn search(fields: &[&str], query: impl Into<String>) -> Self {
        Filter::Search {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            query: query.into(),
        }
    }

    /// Conjunction with another filter, flattening nested `And`s
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::And(mut a), Filter::And(b)) => {
                a.extend(b);
                Filter::And(a)
            }
            (Filter::And(mut a), f) => {
                a.push(f);
                Filter::And(a)
            }
            (f, Filter::And(mut b)) => {
                b.insert(0, f);
                Filter::And(b)
            }
            (a, b) => Filter::And(vec![a, b]),
        }
    }

    /// Evaluate the filter against a document
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(path, expected) => {
                get_path(doc, path).is_some_and(|v| values_equal(v, expected))
                    || values_at(doc, path)
                        .iter()
                        .any(|v| values_equal(v, expected))
            }
            Filter::In(path, candidates) => values_at(doc, path)
                .iter()
                .any(|v| candidates.iter().any(|c| values_equal(v, c))),
            Filter::Gt(path, bound) => values_at(doc, path)
                .iter()
                .filter_map(Value::as_f64)
                .any(|n| n > *bound),
            Filter::Exists(path, wanted) => {
                let present = get_path(doc, path).is_some_and(|v| !v.is_null());
                present == *wanted
            }
            Filter::Search { fields, query } => {
                let needle = query.to_lowercase();
                fields.iter().any(|field| {
                    values_at(doc, field)
                        .iter()
                        .filter_map(Value::as_str)
                        .any(|s| s.to_lowercase().contains(&needle))
                })
            }
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }
}

/// Field-level modification applied by [`DocumentStore::update_one`]
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Set(String, Value),
    Unset(String),
    /// Add to a numeric field, treating a missing field as zero
    Inc(String, i64),
    /// Append to an array unless an equal element is already present
    AddToSet(String, Value),
    /// Remove every equal element from an array
    Pull(String, Value),
}

impl Update {
    pub fn set(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Update::Set(path.into(), value.into())
    }

    /// The field path this update touches
    pub fn path(&self) -> &str {
        match self {
            Update::Set(p, _)
            | Update::Unset(p)
            | Update::Inc(p, _)
            | Update::AddToSet(p, _)
            | Update::Pull(p, _) => p,
        }
    }
}

/// Apply updates in order and refresh `updatedAt`
pub fn apply_updates(doc: &mut Document, updates: &[Update]) -> StoreResult<()> {
    for update in updates {
        if update.path() == ID_FIELD {
            return Err(StoreError::InvalidDocument(
                "the _id field is immutable".to_string(),
            ));
        }
        match update {
            Update::Set(path, value) => set_path(doc, path, value.clone()),
            Update::Unset(path) => {
                remove_path(doc, path);
            }
            Update::Inc(path, delta) => {
                let current = get_path(doc, path).and_then(Value::as_i64).unwrap_or(0);
                set_path(doc, path, Value::from(current + delta));
            }
            Update::AddToSet(path, value) => {
                let mut items = array_at(doc, path)?;
                if !items.iter().any(|v| values_equal(v, value)) {
                    items.push(value.clone());
                }
                set_path(doc, path, Value::Array(items));
            }
            Update::Pull(path, value) => {
                let mut items = array_at(doc, path)?;
                items.retain(|v| !values_equal(v, value));
                set_path(doc, path, Value::Array(items));
            }
        }
    }
    doc.insert(UPDATED_AT.to_string(), now_timestamp());
    Ok(())
}

fn array_at(doc: &Document, path: &str) -> StoreResult<Vec<Value>> {
    match get_path(doc, path) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(_) => Err(StoreError::InvalidDocument(format!(
            "field {} is not an array",
            path
        ))),
    }
}

/// Current time in the format used for document timestamps
pub fn now_timestamp() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Fill in `_id` and timestamps, returning the document id
pub fn prepare_insert(doc: &mut Document) -> StoreResult<Uuid> {
    let id = match doc.get(ID_FIELD) {
        None | Some(Value::Null) => {
            let id = Uuid::new_v4();
            doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
            id
        }
        Some(Value::String(raw)) => Uuid::parse_str(raw)
            .map_err(|_| StoreError::InvalidDocument(format!("invalid _id {}", raw)))?,
        Some(other) => {
            return Err(StoreError::InvalidDocument(format!(
                "invalid _id {}",
                other
            )));
        }
    };

    let now = now_timestamp();
    for field in [CREATED_AT, UPDATED_AT] {
        if doc.get(field).is_none_or(Value::is_null) {
            doc.insert(field.to_string(), now.clone());
        }
    }
    Ok(id)
}

/// Unique index definition: the combination of `fields` is unique within a
/// collection among documents where every field is present and non-null
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueIndex {
    pub collection: String,
    pub fields: Vec<String>,
}

impl UniqueIndex {
    /// Key of `doc` under this index, or `None` when a field is missing
    pub fn key_of(&self, doc: &Document) -> Option<Vec<Value>> {
        self.fields
            .iter()
            .map(|f| get_path(doc, f).filter(|v| !v.is_null()).cloned())
            .collect()
    }

    pub fn describe(&self) -> String {
        self.fields.join(", ")
    }
}

/// Order and window applied by [`DocumentStore::find_window`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Field path and direction; ties keep insertion order
    pub sort: Option<(String, SortDirection)>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    /// Sort, skip and truncate an already filtered result set
    pub fn apply(&self, mut docs: Vec<Document>) -> Vec<Document> {
        if let Some((field, direction)) = &self.sort {
            docs.sort_by(|a, b| {
                let ordering = compare_values(get_path(a, field), get_path(b, field));
                match direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }
        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let limit = self
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));
        docs.into_iter().skip(skip).take(limit).collect()
    }
}

/// Storage backend for JSON documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Declare a unique index over top-level fields of a collection
    async fn ensure_unique(&self, collection: &str, fields: &[&str]) -> StoreResult<()>;

    /// Insert a document, assigning `_id` and timestamps when absent
    async fn insert(&self, collection: &str, doc: Document) -> StoreResult<Document>;

    /// All matching documents in insertion order
    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        Ok(self.find(collection, filter).await?.into_iter().next())
    }

    /// Matching documents ordered and windowed by `options`
    async fn find_window(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>> {
        Ok(options.apply(self.find(collection, filter).await?))
    }

    /// Atomically modify the first matching document, returning the new version
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        updates: &[Update],
    ) -> StoreResult<Option<Document>>;

    /// Delete the first matching document, returning it
    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>>;

    /// Delete every matching document, returning how many were removed
    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        Ok(self.find(collection, filter).await?.len() as u64)
    }

    async fn health_check(&self) -> StoreResult<bool>;
}

/// Serialize a model into a document
pub fn to_document<T: Serialize>(value: &T) -> StoreResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

/// Deserialize a document into a model
pub fn from_document<T: DeserializeOwned>(doc: Document) -> StoreResult<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

/// Typed view over one collection of a [`DocumentStore`]
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            name: self.name,
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>, name: &'static str) -> Self {
        Self {
            store,
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub async fn insert(&self, value: &T) -> StoreResult<T> {
        let doc = self.store.insert(self.name, to_document(value)?).await?;
        from_document(doc)
    }

    pub async fn find(&self, filter: &Filter) -> StoreResult<Vec<T>> {
        self.store
            .find(self.name, filter)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub async fn find_one(&self, filter: &Filter) -> StoreResult<Option<T>> {
        self.store
            .find_one(self.name, filter)
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<T>> {
        self.find_one(&Filter::id(id)).await
    }

    pub async fn update_one(&self, filter: &Filter, updates: &[Update]) -> StoreResult<Option<T>> {
        self.store
            .update_one(self.name, filter, updates)
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn update_by_id(&self, id: Uuid, updates: &[Update]) -> StoreResult<Option<T>> {
        self.update_one(&Filter::id(id), updates).await
    }

    pub async fn delete_one(&self, filter: &Filter) -> StoreResult<Option<T>> {
        self.store
            .delete_one(self.name, filter)
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn delete_many(&self, filter: &Filter) -> StoreResult<u64> {
        self.store.delete_many(self.name, filter).await
    }

    pub async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        self.store.count(self.name, filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_eq_matches_array_membership() {
        let playlist = doc(json!({"videos": ["a", "b"], "owner": "u1"}));
        assert!(Filter::eq("videos", "b").matches(&playlist));
        assert!(!Filter::eq("videos", "c").matches(&playlist));
        assert!(
            Filter::eq("owner", "u1")
                .and(Filter::eq("videos", "a"))
                .matches(&playlist)
        );
    }

    #[test]
    fn test_find_options_sort_then_window() {
        let docs = vec![
            doc(json!({"n": 2, "tag": "a"})),
            doc(json!({"n": 3})),
            doc(json!({"n": 2, "tag": "b"})),
            doc(json!({"tag": "missing"})),
        ];
        let options = FindOptions {
            sort: Some(("n".to_string(), SortDirection::Descending)),
            skip: 1,
            limit: Some(2),
        };
        let window = options.apply(docs.clone());
        assert_eq!(window, vec![docs[0].clone(), docs[2].clone()]);

        let past_end = FindOptions {
            skip: u64::MAX,
            ..FindOptions::default()
        };
        assert!(past_end.apply(docs).is_empty());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let video = doc(json!({"title": "Rust Ownership", "description": "borrowck"}));
        assert!(Filter::search(&["title", "description"], "ownERship").matches(&video));
        assert!(Filter::search(&["title", "description"], "BORROW").matches(&video));
        assert!(!Filter::search(&["title"], "borrow").matches(&video));
    }

    #[test]
    fn test_exists_and_gt() {
        let user = doc(json!({"refreshToken": null, "expiry": 10}));
        assert!(Filter::Exists("refreshToken".into(), false).matches(&user));
        assert!(Filter::Gt("expiry".into(), 5.0).matches(&user));
        assert!(!Filter::Gt("expiry".into(), 10.0).matches(&user));
    }

    #[test]
    fn test_apply_updates() {
        let mut video = doc(json!({"_id": "v", "views": 1, "tags": ["a"]}));
        apply_updates(
            &mut video,
            &[
                Update::Inc("views".into(), 2),
                Update::AddToSet("tags".into(), json!("a")),
                Update::AddToSet("tags".into(), json!("b")),
                Update::Pull("tags".into(), json!("a")),
                Update::set("title", "new"),
            ],
        )
        .expect("updates apply");

        assert_eq!(video["views"], json!(3));
        assert_eq!(video["tags"], json!(["b"]));
        assert_eq!(video["title"], json!("new"));
        assert!(video.contains_key(UPDATED_AT));
    }

    #[test]
    fn test_apply_updates_rejects_id_change() {
        let mut d = doc(json!({"_id": "x"}));
        let result = apply_updates(&mut d, &[Update::set("_id", "y")]);
        assert!(matches!(result, Err(StoreError::InvalidDocument(_))));
    }

    #[test]
    fn test_prepare_insert_assigns_id_and_timestamps() {
        let mut d = doc(json!({"content": "hi"}));
        let id = prepare_insert(&mut d).expect("prepared");
        assert_eq!(d[ID_FIELD], json!(id.to_string()));
        assert!(d.contains_key(CREATED_AT));
        assert!(d.contains_key(UPDATED_AT));

        let mut bad = doc(json!({"_id": "not-a-uuid"}));
        assert!(prepare_insert(&mut bad).is_err());
    }

    #[test]
    fn test_unique_index_key_requires_all_fields() {
        let index = UniqueIndex {
            collection: "likes".into(),
            fields: vec!["video".into(), "likedBy".into()],
        };
        assert!(index.key_of(&doc(json!({"video": "v", "likedBy": "u"}))).is_some());
        assert!(index.key_of(&doc(json!({"tweet": "t", "likedBy": "u"}))).is_none());
    }
}
