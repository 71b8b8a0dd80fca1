//! In-memory document store
//!
//! Backs tests and local runs. All collections live behind one `RwLock`, so
//! every write is atomic with respect to every other operation.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    Document, DocumentStore, Filter, ID_FIELD, UniqueIndex, Update, apply_updates, prepare_insert,
};
use crate::error::{StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Vec<Document>>,
    indexes: Vec<UniqueIndex>,
}

impl Inner {
    /// Fail when `doc` collides with another document on a unique index
    fn check_unique(&self, collection: &str, doc: &Document) -> StoreResult<()> {
        let Some(docs) = self.collections.get(collection) else {
            return Ok(());
        };

        for index in self.indexes.iter().filter(|i| i.collection == collection) {
            let Some(key) = index.key_of(doc) else {
                continue;
            };
            let clash = docs
                .iter()
                .filter(|other| other.get(ID_FIELD) != doc.get(ID_FIELD))
                .any(|other| index.key_of(other).as_ref() == Some(&key));
            if clash {
                return Err(StoreError::Duplicate {
                    collection: collection.to_string(),
                    fields: index.describe(),
                });
            }
        }
        Ok(())
    }

    fn id_taken(&self, collection: &str, doc: &Document) -> bool {
        self.collections.get(collection).is_some_and(|docs| {
            docs.iter()
                .any(|d| d.get(ID_FIELD).is_some() && d.get(ID_FIELD) == doc.get(ID_FIELD))
        })
    }
}

/// Document store keeping everything in process memory
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ensure_unique(&self, collection: &str, fields: &[&str]) -> StoreResult<()> {
        let index = UniqueIndex {
            collection: collection.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        };
        let mut inner = self.inner.write().await;
        if !inner.indexes.contains(&index) {
            debug!("Registered unique index on {} ({})", collection, index.describe());
            inner.indexes.push(index);
        }
        Ok(())
    }

    async fn insert(&self, collection: &str, mut doc: Document) -> StoreResult<Document> {
        prepare_insert(&mut doc)?;
        let mut inner = self.inner.write().await;
        if inner.id_taken(collection, &doc) {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                fields: ID_FIELD.to_string(),
            });
        }
        inner.check_unique(collection, &doc)?;
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(doc.clone());
        Ok(doc)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        updates: &[Update],
    ) -> StoreResult<Option<Document>> {
        let mut inner = self.inner.write().await;
        let Some(position) = inner
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().position(|d| filter.matches(d)))
        else {
            return Ok(None);
        };

        let mut updated = inner.collections[collection][position].clone();
        apply_updates(&mut updated, updates)?;
        inner.check_unique(collection, &updated)?;

        if let Some(docs) = inner.collections.get_mut(collection) {
            docs[position] = updated.clone();
        }
        Ok(Some(updated))
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        let mut inner = self.inner.write().await;
        let Some(docs) = inner.collections.get_mut(collection) else {
            return Ok(None);
        };
        Ok(docs
            .iter()
            .position(|d| filter.matches(d))
            .map(|position| docs.remove(position)))
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        let Some(docs) = inner.collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !filter.matches(d));
        Ok((before - docs.len()) as u64)
    }

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_insert_find_update_delete() {
        let store = MemoryStore::new();
        let inserted = store
            .insert("tweets", doc(json!({"content": "hello", "owner": "u1"})))
            .await
            .expect("insert");
        let id = inserted[ID_FIELD].clone();

        let found = store
            .find("tweets", &Filter::eq("owner", "u1"))
            .await
            .expect("find");
        assert_eq!(found.len(), 1);

        let updated = store
            .update_one(
                "tweets",
                &Filter::Eq(ID_FIELD.into(), id.clone()),
                &[Update::set("content", "bye")],
            )
            .await
            .expect("update")
            .expect("document exists");
        assert_eq!(updated["content"], json!("bye"));

        let removed = store
            .delete_one("tweets", &Filter::Eq(ID_FIELD.into(), id))
            .await
            .expect("delete");
        assert!(removed.is_some());
        assert_eq!(store.count("tweets", &Filter::All).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicates() {
        let store = MemoryStore::new();
        store
            .ensure_unique("likes", &["video", "likedBy"])
            .await
            .expect("index");

        store
            .insert("likes", doc(json!({"video": "v", "likedBy": "u"})))
            .await
            .expect("first like");
        let second = store
            .insert("likes", doc(json!({"video": "v", "likedBy": "u"})))
            .await;
        assert!(matches!(second, Err(StoreError::Duplicate { .. })));

        // Documents lacking an indexed field are outside the index
        store
            .insert("likes", doc(json!({"tweet": "t", "likedBy": "u"})))
            .await
            .expect("tweet like");
        store
            .insert("likes", doc(json!({"tweet": "t2", "likedBy": "u"})))
            .await
            .expect("another tweet like");
    }

    #[tokio::test]
    async fn test_update_cannot_violate_unique_index() {
        let store = MemoryStore::new();
        store.ensure_unique("users", &["username"]).await.expect("index");
        store
            .insert("users", doc(json!({"username": "alice"})))
            .await
            .expect("alice");
        store
            .insert("users", doc(json!({"username": "bobby"})))
            .await
            .expect("bobby");

        let result = store
            .update_one(
                "users",
                &Filter::eq("username", "bobby"),
                &[Update::set("username", "alice")],
            )
            .await;
        assert!(matches!(result, Err(StoreError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn test_delete_many_counts_removed() {
        let store = MemoryStore::new();
        for owner in ["a", "a", "b"] {
            store
                .insert("comments", doc(json!({"owner": owner})))
                .await
                .expect("insert");
        }
        let removed = store
            .delete_many("comments", &Filter::eq("owner", "a"))
            .await
            .expect("delete");
        assert_eq!(removed, 2);
        assert_eq!(
            store.count("comments", &Filter::All).await.expect("count"),
            1
        );
    }
}
