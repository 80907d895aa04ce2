//! services/api/src/adapters/memory.rs
//!
//! In-process implementation of the `DocumentStore` port, used for local
//! development and tests. One lock guards all collections, which makes the
//! batched `commit` trivially atomic; change notifications fan out through
//! a per-document broadcast channel.

use async_trait::async_trait;
use futures::StreamExt;
use samvaad_core::ports::{DocumentStore, DocumentWatch, PortError, PortResult, WriteOp};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{broadcast, Mutex};

const WATCH_BUFFER: usize = 64;

type DocKey = (String, String);

#[derive(Default)]
struct Inner {
    /// collection -> document id -> document
    docs: HashMap<String, HashMap<String, Value>>,
    watchers: HashMap<DocKey, broadcast::Sender<Option<Value>>>,
}

impl Inner {
    fn get(&self, collection: &str, id: &str) -> Option<&Value> {
        self.docs.get(collection).and_then(|c| c.get(id))
    }

    fn notify(&self, collection: &str, id: &str) {
        let key = (collection.to_string(), id.to_string());
        if let Some(tx) = self.watchers.get(&key) {
            let _ = tx.send(self.get(collection, id).cloned());
        }
    }

    fn apply(&mut self, op: &WriteOp) -> PortResult<DocKey> {
        match op {
            WriteOp::Set { collection, id, doc } => {
                self.docs
                    .entry(collection.clone())
                    .or_default()
                    .insert(id.clone(), doc.clone());
                Ok((collection.clone(), id.clone()))
            }
            WriteOp::Update { collection, id, fields } => {
                let doc = self
                    .docs
                    .get_mut(collection)
                    .and_then(|c| c.get_mut(id))
                    .ok_or_else(|| PortError::NotFound(format!("{collection}/{id}")))?;
                let (Value::Object(target), Value::Object(incoming)) = (doc, fields) else {
                    return Err(PortError::Invalid(
                        "update requires object documents".to_string(),
                    ));
                };
                for (k, v) in incoming {
                    target.insert(k.clone(), v.clone());
                }
                Ok((collection.clone(), id.clone()))
            }
            WriteOp::Append { collection, id, field, value } => {
                let doc = self
                    .docs
                    .get_mut(collection)
                    .and_then(|c| c.get_mut(id))
                    .ok_or_else(|| PortError::NotFound(format!("{collection}/{id}")))?;
                let Value::Object(target) = doc else {
                    return Err(PortError::Invalid(
                        "append requires an object document".to_string(),
                    ));
                };
                let entry = target.entry(field.clone()).or_insert_with(|| Value::Array(vec![]));
                let Value::Array(items) = entry else {
                    return Err(PortError::Invalid(format!("field {field} is not an array")));
                };
                items.push(value.clone());
                Ok((collection.clone(), id.clone()))
            }
        }
    }

    /// Existence pre-check so a failing batch leaves nothing half-applied.
    fn check(&self, op: &WriteOp) -> PortResult<()> {
        match op {
            WriteOp::Set { .. } => Ok(()),
            WriteOp::Update { collection, id, .. } | WriteOp::Append { collection, id, .. } => {
                self.get(collection, id)
                    .map(|_| ())
                    .ok_or_else(|| PortError::NotFound(format!("{collection}/{id}")))
            }
        }
    }
}

/// A `DocumentStore` holding everything in process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> PortResult<Option<Value>> {
        Ok(self.inner.lock().await.get(collection, id).cloned())
    }

    async fn set(&self, collection: &str, id: &str, doc: Value) -> PortResult<()> {
        let mut inner = self.inner.lock().await;
        inner.apply(&WriteOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            doc,
        })?;
        inner.notify(collection, id);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> PortResult<()> {
        let mut inner = self.inner.lock().await;
        inner.apply(&WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        })?;
        inner.notify(collection, id);
        Ok(())
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> PortResult<Vec<Value>> {
        let inner = self.inner.lock().await;
        let hits = inner
            .docs
            .get(collection)
            .map(|c| {
                c.values()
                    .filter(|doc| doc.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(hits)
    }

    async fn append(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> PortResult<()> {
        let mut inner = self.inner.lock().await;
        inner.apply(&WriteOp::Append {
            collection: collection.to_string(),
            id: id.to_string(),
            field: field.to_string(),
            value,
        })?;
        inner.notify(collection, id);
        Ok(())
    }

    async fn watch(&self, collection: &str, id: &str) -> PortResult<DocumentWatch> {
        // Snapshot and subscribe under the same lock acquisition so no
        // change can slip between the two.
        let mut inner = self.inner.lock().await;
        let key = (collection.to_string(), id.to_string());
        let tx = inner
            .watchers
            .entry(key)
            .or_insert_with(|| broadcast::channel(WATCH_BUFFER).0);
        let mut rx = tx.subscribe();
        let initial = inner.get(collection, id).cloned();
        drop(inner);

        let stream = async_stream::stream! {
            yield initial;
            loop {
                match rx.recv().await {
                    Ok(doc) => yield doc,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };
        Ok(stream.boxed())
    }

    async fn commit(&self, writes: Vec<WriteOp>) -> PortResult<()> {
        let mut inner = self.inner.lock().await;
        for op in &writes {
            inner.check(op)?;
        }
        let mut touched = Vec::with_capacity(writes.len());
        for op in &writes {
            touched.push(inner.apply(op)?);
        }
        touched.dedup();
        for (collection, id) in touched {
            inner.notify(&collection, &id);
        }
        Ok(())
    }
}
