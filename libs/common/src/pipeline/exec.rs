//! Pipeline interpreter

use chrono::{DateTime, Datelike, Timelike, Utc};
use futures::future::BoxFuture;
use serde_json::{Map, Value, json};

use super::page::{Page, PageRequest};
use super::{Expr, Join, Pipeline, Projection, SortDirection, Stage};
use crate::error::StoreResult;
use crate::path::{compare_values, get_path, set_path, values_at, values_equal};
use crate::store::{Document, DocumentStore, Filter, FindOptions, ID_FIELD};

/// A document flowing through the stages, tagged with the join keys it was
/// fetched under
struct Row {
    keys: Vec<Value>,
    doc: Document,
}

/// Run `pipeline` over `collection`
///
/// Leading search and match stages are handed to the store as one filter;
/// the remaining stages run in process.
pub fn execute<'a>(
    store: &'a dyn DocumentStore,
    collection: &'a str,
    pipeline: &'a Pipeline,
) -> BoxFuture<'a, StoreResult<Vec<Document>>> {
    Box::pin(async move {
        let (filter, rest) = split_pushdown(pipeline.stages());
        let docs = store.find(collection, &filter).await?;
        let rows = docs
            .into_iter()
            .map(|doc| Row {
                keys: Vec::new(),
                doc,
            })
            .collect();
        let rows = run_stages(store, rows, rest).await?;
        Ok(rows.into_iter().map(|row| row.doc).collect())
    })
}

/// Run `pipeline` and return the requested page of its output
///
/// When every stage after the pushed-down filter and an optional leading
/// sort keeps one output row per input document, the store counts and
/// windows the collection itself and only the page runs through the rest.
pub async fn execute_paged(
    store: &dyn DocumentStore,
    collection: &str,
    pipeline: &Pipeline,
    request: PageRequest,
) -> StoreResult<Page<Document>> {
    let (filter, rest) = split_pushdown(pipeline.stages());
    let (sort, rest) = match rest.split_first() {
        Some((Stage::Sort { field, direction }, tail)) => (Some((field.clone(), *direction)), tail),
        _ => (None, rest),
    };
    if !rest.iter().all(preserves_rows) {
        let docs = execute(store, collection, pipeline).await?;
        return Ok(Page::from_all(docs, request));
    }

    let total = store.count(collection, &filter).await?;
    let options = FindOptions {
        sort,
        skip: request.offset(),
        limit: Some(request.limit),
    };
    let docs = if request.offset() >= total {
        Vec::new()
    } else {
        store.find_window(collection, &filter, &options).await?
    };
    let rows = docs
        .into_iter()
        .map(|doc| Row {
            keys: Vec::new(),
            doc,
        })
        .collect();
    let rows = run_stages(store, rows, rest).await?;
    let docs = rows.into_iter().map(|row| row.doc).collect();
    Ok(Page::from_parts(docs, total, request))
}

/// Stages that neither drop nor duplicate rows and leave their order alone
fn preserves_rows(stage: &Stage) -> bool {
    matches!(
        stage,
        Stage::Join(_) | Stage::Derive { .. } | Stage::Project(_)
    )
}

/// Fold the leading search/match stages into one filter
fn split_pushdown(stages: &[Stage]) -> (Filter, &[Stage]) {
    let mut filter = Filter::All;
    let mut consumed = 0;
    for stage in stages {
        match stage {
            Stage::Search { fields, query } => {
                filter = filter.and(Filter::Search {
                    fields: fields.clone(),
                    query: query.clone(),
                });
            }
            Stage::Match(inner) => filter = filter.and(inner.clone()),
            _ => break,
        }
        consumed += 1;
    }
    (filter, &stages[consumed..])
}

fn run_stages<'a>(
    store: &'a dyn DocumentStore,
    mut rows: Vec<Row>,
    stages: &'a [Stage],
) -> BoxFuture<'a, StoreResult<Vec<Row>>> {
    Box::pin(async move {
        for stage in stages {
            rows = match stage {
                Stage::Search { fields, query } => {
                    let filter = Filter::Search {
                        fields: fields.clone(),
                        query: query.clone(),
                    };
                    rows.into_iter().filter(|r| filter.matches(&r.doc)).collect()
                }
                Stage::Match(filter) => rows
                    .into_iter()
                    .filter(|r| filter.matches(&r.doc))
                    .collect(),
                Stage::Join(join) => run_join(store, rows, join).await?,
                Stage::Unwind(field) => unwind(rows, field),
                Stage::Derive { field, expr } => {
                    for row in rows.iter_mut() {
                        let value = evaluate(&row.doc, expr);
                        set_path(&mut row.doc, field, value);
                    }
                    rows
                }
                Stage::Project(projection) => rows
                    .into_iter()
                    .map(|row| Row {
                        doc: project(&row.doc, projection),
                        keys: row.keys,
                    })
                    .collect(),
                Stage::Sort { field, direction } => {
                    // sort_by is stable, so ties keep their incoming order
                    rows.sort_by(|a, b| {
                        let ordering =
                            compare_values(get_path(&a.doc, field), get_path(&b.doc, field));
                        match direction {
                            SortDirection::Ascending => ordering,
                            SortDirection::Descending => ordering.reverse(),
                        }
                    });
                    rows
                }
            };
        }
        Ok(rows)
    })
}

async fn run_join(
    store: &dyn DocumentStore,
    mut rows: Vec<Row>,
    join: &Join,
) -> StoreResult<Vec<Row>> {
    let mut wanted: Vec<Value> = Vec::new();
    for row in &rows {
        for value in values_at(&row.doc, &join.local_field) {
            if !value.is_null() && !wanted.iter().any(|w| values_equal(w, &value)) {
                wanted.push(value);
            }
        }
    }

    // One query for the whole stage, then the nested stages over the batch
    let joined = if wanted.is_empty() {
        Vec::new()
    } else {
        let (sub_filter, rest) = split_pushdown(join.pipeline.stages());
        let filter = Filter::In(join.foreign_field.clone(), wanted).and(sub_filter);
        let foreign = store.find(&join.from, &filter).await?;
        let foreign_rows = foreign
            .into_iter()
            .map(|doc| Row {
                keys: values_at(&doc, &join.foreign_field),
                doc,
            })
            .collect();
        run_stages(store, foreign_rows, rest).await?
    };

    for row in rows.iter_mut() {
        let mut emitted = vec![false; joined.len()];
        let mut matched: Vec<Value> = Vec::new();
        for local in values_at(&row.doc, &join.local_field) {
            for (i, candidate) in joined.iter().enumerate() {
                if !emitted[i] && candidate.keys.iter().any(|k| values_equal(k, &local)) {
                    emitted[i] = true;
                    matched.push(Value::Object(candidate.doc.clone()));
                }
            }
        }
        set_path(&mut row.doc, &join.as_field, Value::Array(matched));
    }
    Ok(rows)
}

fn unwind(rows: Vec<Row>, field: &str) -> Vec<Row> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match get_path(&row.doc, field).cloned() {
            Some(Value::Array(items)) => {
                for item in items {
                    let mut doc = row.doc.clone();
                    set_path(&mut doc, field, item);
                    out.push(Row {
                        keys: row.keys.clone(),
                        doc,
                    });
                }
            }
            None | Some(Value::Null) => {}
            Some(_) => out.push(row),
        }
    }
    out
}

fn evaluate(doc: &Document, expr: &Expr) -> Value {
    match expr {
        Expr::Size(path) => match get_path(doc, path) {
            Some(Value::Array(items)) => Value::from(items.len() as u64),
            _ => Value::from(0u64),
        },
        Expr::Contains { path, value } => {
            Value::Bool(values_at(doc, path).iter().any(|v| values_equal(v, value)))
        }
        Expr::Sum(path) => {
            let numbers: Vec<Value> = values_at(doc, path)
                .into_iter()
                .filter(Value::is_number)
                .collect();
            if numbers.iter().all(Value::is_i64) {
                Value::from(numbers.iter().filter_map(Value::as_i64).sum::<i64>())
            } else {
                Value::from(numbers.iter().filter_map(Value::as_f64).sum::<f64>())
            }
        }
        Expr::First(path) => match get_path(doc, path) {
            Some(Value::Array(items)) => items.first().cloned().unwrap_or(Value::Null),
            Some(other) => other.clone(),
            None => Value::Null,
        },
        Expr::Last(path) => match get_path(doc, path) {
            Some(Value::Array(items)) => items.last().cloned().unwrap_or(Value::Null),
            Some(other) => other.clone(),
            None => Value::Null,
        },
        Expr::DateParts(path) => get_path(doc, path)
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| {
                let dt = dt.with_timezone(&Utc);
                json!({
                    "year": dt.year(),
                    "month": dt.month(),
                    "day": dt.day(),
                    "hour": dt.hour(),
                    "minute": dt.minute(),
                    "second": dt.second(),
                    "millisecond": dt.timestamp_subsec_millis(),
                })
            })
            .unwrap_or(Value::Null),
        Expr::Literal(value) => value.clone(),
    }
}

fn project(doc: &Document, projection: &Projection) -> Document {
    let paths: Vec<&str> = projection.fields.iter().map(String::as_str).collect();
    let mut out = project_map(doc, &paths);
    if projection.exclude_id {
        out.remove(ID_FIELD);
    } else if let Some(id) = doc.get(ID_FIELD) {
        out.insert(ID_FIELD.to_string(), id.clone());
    }
    out
}

/// Keep only `paths`; arrays of objects are projected element-wise, so
/// `videos.title` keeps just the title of every joined video
fn project_map(map: &Document, paths: &[&str]) -> Document {
    let mut heads: Vec<&str> = Vec::new();
    for path in paths {
        let head = path.split_once('.').map_or(*path, |(head, _)| head);
        if !heads.contains(&head) {
            heads.push(head);
        }
    }

    let mut out = Map::new();
    for head in heads {
        let Some(value) = map.get(head) else {
            continue;
        };
        let projected = if paths.contains(&head) {
            value.clone()
        } else {
            let tails: Vec<&str> = paths
                .iter()
                .filter_map(|p| p.strip_prefix(head).and_then(|rest| rest.strip_prefix('.')))
                .collect();
            project_value(value, &tails)
        };
        out.insert(head.to_string(), projected);
    }
    out
}

fn project_value(value: &Value, paths: &[&str]) -> Value {
    match value {
        Value::Object(map) => Value::Object(project_map(map, paths)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| project_value(item, paths))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    async fn seed(store: &MemoryStore, collection: &str, docs: Vec<Value>) {
        for d in docs {
            store.insert(collection, doc(d)).await.expect("seed insert");
        }
    }

    async fn fixture() -> MemoryStore {
        let store = MemoryStore::new();
        seed(
            &store,
            "users",
            vec![
                json!({"_id": "00000000-0000-4000-8000-000000000001", "username": "alice", "password": "h"}),
                json!({"_id": "00000000-0000-4000-8000-000000000002", "username": "bobby", "password": "h"}),
            ],
        )
        .await;
        seed(
            &store,
            "videos",
            vec![
                json!({"_id": "00000000-0000-4000-8000-0000000000a1", "title": "Intro to Rust", "owner": "00000000-0000-4000-8000-000000000001", "views": 10, "createdAt": "2024-01-01T00:00:00Z"}),
                json!({"_id": "00000000-0000-4000-8000-0000000000a2", "title": "Async deep dive", "owner": "00000000-0000-4000-8000-000000000001", "views": 5, "createdAt": "2024-02-01T00:00:00Z"}),
                json!({"_id": "00000000-0000-4000-8000-0000000000a3", "title": "Cooking", "owner": "00000000-0000-4000-8000-000000000002", "views": 1, "createdAt": "2024-03-01T00:00:00Z"}),
            ],
        )
        .await;
        seed(
            &store,
            "likes",
            vec![
                json!({"video": "00000000-0000-4000-8000-0000000000a1", "likedBy": "00000000-0000-4000-8000-000000000002"}),
                json!({"video": "00000000-0000-4000-8000-0000000000a1", "likedBy": "00000000-0000-4000-8000-000000000001"}),
            ],
        )
        .await;
        store
    }

    #[tokio::test]
    async fn test_join_first_and_project() {
        let store = fixture().await;
        let pipeline = Pipeline::new()
            .join(
                Join::new("users", "owner", "_id", "owner")
                    .pipeline(Pipeline::new().project(Projection::new(&["username"]))),
            )
            .derive("owner", Expr::First("owner".into()))
            .project(Projection::new(&["title", "owner"]))
            .sort("createdAt", SortDirection::Ascending);

        let docs = execute(&store, "videos", &pipeline).await.expect("execute");
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0]["owner"]["username"], json!("alice"));
        assert!(docs[0]["owner"].get("password").is_none());
        assert_eq!(docs[2]["owner"]["username"], json!("bobby"));
        // Sort ran after projection removed createdAt, so insertion order holds
        assert_eq!(docs[0]["title"], json!("Intro to Rust"));
    }

    #[tokio::test]
    async fn test_like_count_and_membership() {
        let store = fixture().await;
        let viewer = "00000000-0000-4000-8000-000000000002";
        let pipeline = Pipeline::new()
            .filter(Filter::eq("_id", "00000000-0000-4000-8000-0000000000a1"))
            .join(Join::new("likes", "_id", "video", "likes"))
            .derive("likesCount", Expr::Size("likes".into()))
            .derive("isLiked", Expr::contains("likes.likedBy", viewer))
            .project(Projection::new(&["likesCount", "isLiked"]));

        let docs = execute(&store, "videos", &pipeline).await.expect("execute");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["likesCount"], json!(2));
        assert_eq!(docs[0]["isLiked"], json!(true));
    }

    #[tokio::test]
    async fn test_join_preserves_local_array_order() {
        let store = fixture().await;
        seed(
            &store,
            "playlists",
            vec![json!({
                "name": "mix",
                "videos": [
                    "00000000-0000-4000-8000-0000000000a3",
                    "00000000-0000-4000-8000-0000000000a1"
                ]
            })],
        )
        .await;

        let pipeline = Pipeline::new()
            .join(Join::new("videos", "videos", "_id", "videos"))
            .derive("totalViews", Expr::Sum("videos.views".into()))
            .project(Projection::new(&["videos.title", "totalViews"]));

        let docs = execute(&store, "playlists", &pipeline)
            .await
            .expect("execute");
        assert_eq!(
            docs[0]["videos"],
            json!([{"title": "Cooking"}, {"title": "Intro to Rust"}])
        );
        assert_eq!(docs[0]["totalViews"], json!(11));
    }

    #[tokio::test]
    async fn test_search_and_unwind() {
        let store = fixture().await;
        let pipeline = Pipeline::new()
            .join(Join::new("likes", "_id", "video", "likes"))
            .unwind("likes")
            .search(&["title"], "rust");

        let docs = execute(&store, "videos", &pipeline).await.expect("execute");
        // One row per like on the single matching video
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d["title"] == json!("Intro to Rust")));
    }

    #[tokio::test]
    async fn test_sort_descending_and_date_parts() {
        let store = fixture().await;
        let pipeline = Pipeline::new()
            .sort("createdAt", SortDirection::Descending)
            .derive("createdAt", Expr::DateParts("createdAt".into()));

        let docs = execute(&store, "videos", &pipeline).await.expect("execute");
        assert_eq!(docs[0]["title"], json!("Cooking"));
        assert_eq!(docs[0]["createdAt"]["month"], json!(3));
        assert_eq!(docs[2]["createdAt"]["year"], json!(2024));
    }

    #[tokio::test]
    async fn test_join_without_local_values_yields_empty_array() {
        let store = fixture().await;
        seed(&store, "tweets", vec![json!({"content": "orphan"})]).await;
        let pipeline = Pipeline::new()
            .join(Join::new("users", "owner", "_id", "owner"))
            .derive("owner", Expr::First("owner".into()));

        let docs = execute(&store, "tweets", &pipeline).await.expect("execute");
        assert_eq!(docs[0]["owner"], Value::Null);
    }

    #[tokio::test]
    async fn test_execute_paged() {
        let store = fixture().await;
        let pipeline = Pipeline::new().sort("createdAt", SortDirection::Ascending);
        let page = execute_paged(&store, "videos", &pipeline, PageRequest::new(Some(2), Some(2)))
            .await
            .expect("execute");
        assert_eq!(page.docs.len(), 1);
        assert_eq!(page.total_docs, 3);
        assert!(!page.has_next_page);
        assert!(page.has_prev_page);
    }

    /// Counts the documents each `find`/`find_window` call hands back
    struct Recording {
        inner: MemoryStore,
        full_reads: std::sync::Mutex<Vec<usize>>,
        window_reads: std::sync::Mutex<Vec<usize>>,
    }

    #[async_trait::async_trait]
    impl DocumentStore for Recording {
        async fn ensure_unique(&self, collection: &str, fields: &[&str]) -> StoreResult<()> {
            self.inner.ensure_unique(collection, fields).await
        }

        async fn insert(&self, collection: &str, doc: Document) -> StoreResult<Document> {
            self.inner.insert(collection, doc).await
        }

        async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
            let docs = self.inner.find(collection, filter).await?;
            if collection == "videos" {
                self.full_reads.lock().unwrap().push(docs.len());
            }
            Ok(docs)
        }

        async fn find_window(
            &self,
            collection: &str,
            filter: &Filter,
            options: &FindOptions,
        ) -> StoreResult<Vec<Document>> {
            let docs = self.inner.find_window(collection, filter, options).await?;
            self.window_reads.lock().unwrap().push(docs.len());
            Ok(docs)
        }

        async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
            self.inner.find_one(collection, filter).await
        }

        async fn update_one(
            &self,
            collection: &str,
            filter: &Filter,
            updates: &[crate::store::Update],
        ) -> StoreResult<Option<Document>> {
            self.inner.update_one(collection, filter, updates).await
        }

        async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
            self.inner.delete_one(collection, filter).await
        }

        async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
            self.inner.delete_many(collection, filter).await
        }

        async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
            self.inner.count(collection, filter).await
        }

        async fn health_check(&self) -> StoreResult<bool> {
            self.inner.health_check().await
        }
    }

    #[tokio::test]
    async fn test_paged_window_reads_only_the_page() {
        let store = Recording {
            inner: fixture().await,
            full_reads: Default::default(),
            window_reads: Default::default(),
        };
        let pipeline = Pipeline::new()
            .filter(Filter::eq("owner", "00000000-0000-4000-8000-000000000002"))
            .sort("createdAt", SortDirection::Descending)
            .join(
                Join::new("users", "owner", "_id", "owner")
                    .pipeline(Pipeline::new().project(Projection::new(&["username"]))),
            )
            .derive("owner", Expr::First("owner".into()))
            .project(Projection::new(&["title", "owner"]));
        let all = Pipeline::new()
            .sort("createdAt", SortDirection::Descending)
            .join(
                Join::new("users", "owner", "_id", "owner")
                    .pipeline(Pipeline::new().project(Projection::new(&["username"]))),
            )
            .derive("owner", Expr::First("owner".into()))
            .project(Projection::new(&["title", "owner"]));

        let page = execute_paged(&store, "videos", &all, PageRequest::new(Some(2), Some(1)))
            .await
            .expect("execute");
        assert_eq!(page.total_docs, 3);
        assert_eq!(page.docs.len(), 1);
        assert_eq!(page.docs[0]["title"], json!("Async deep dive"));
        assert_eq!(page.docs[0]["owner"]["username"], json!("alice"));
        assert_eq!(*store.window_reads.lock().unwrap(), vec![1]);
        assert!(store.full_reads.lock().unwrap().is_empty());

        let full = execute(&store.inner, "videos", &all).await.expect("execute");
        assert_eq!(page.docs[0], full[1]);

        let filtered = execute_paged(&store, "videos", &pipeline, PageRequest::new(None, None))
            .await
            .expect("execute");
        assert_eq!(filtered.total_docs, 1);
        assert_eq!(filtered.docs[0]["owner"]["username"], json!("bobby"));
    }

    #[tokio::test]
    async fn test_paged_falls_back_for_unwind() {
        let store = Recording {
            inner: fixture().await,
            full_reads: Default::default(),
            window_reads: Default::default(),
        };
        let pipeline = Pipeline::new()
            .join(Join::new("likes", "_id", "video", "likes"))
            .unwind("likes");

        let page = execute_paged(&store, "videos", &pipeline, PageRequest::new(None, None))
            .await
            .expect("execute");
        assert_eq!(page.total_docs, 2);
        assert!(store.window_reads.lock().unwrap().is_empty());
        assert_eq!(*store.full_reads.lock().unwrap(), vec![3]);
    }
}
